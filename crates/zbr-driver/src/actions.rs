//! # Command Actions
//!
//! Zero-argument wrappers binding one remote command to one driver
//! instance, and a registry mapping command names to those wrappers for
//! hosts whose automation layer dispatches actions by string key.
//!
//! The binding is one-directional: a wrapper holds a shared back-reference
//! to its parent driver, while the driver knows nothing about its
//! wrappers. All invocations run on the single control thread that also
//! drives [`ZigbeeRouter::poll`](crate::router::ZigbeeRouter::poll).

use alloc::boxed::Box;
use alloc::rc::Rc;

use core::cell::RefCell;

use embedded_hal_nb::serial::{ErrorType, Read, Write};

use hashbrown::HashMap;

use zbr::command::Command;

use crate::router::{ConfigError, LinkError, ZigbeeRouter};

/// A zero-argument action bound to one driver instance.
pub trait RouterAction<E> {
    /// Invokes the action.
    ///
    /// # Errors
    ///
    /// Propagates the [`LinkError`] of the underlying command write.
    fn trigger(&self) -> Result<(), LinkError<E>>;
}

/// Asks the parent module to reset and restart within its current network.
pub struct ResetAction<L>
where
    L: Read<u8> + Write<u8>,
{
    parent: Rc<RefCell<ZigbeeRouter<L>>>,
}

impl<L> ResetAction<L>
where
    L: Read<u8> + Write<u8>,
{
    /// Creates a [`ResetAction`] bound to `parent`.
    #[must_use]
    pub fn new(parent: Rc<RefCell<ZigbeeRouter<L>>>) -> Self {
        Self { parent }
    }
}

impl<L> RouterAction<L::Error> for ResetAction<L>
where
    L: Read<u8> + Write<u8>,
{
    fn trigger(&self) -> Result<(), LinkError<L::Error>> {
        self.parent.borrow_mut().reset()
    }
}

/// Asks the parent module to leave its mesh and attempt to rejoin.
pub struct LeaveAndRejoinAction<L>
where
    L: Read<u8> + Write<u8>,
{
    parent: Rc<RefCell<ZigbeeRouter<L>>>,
}

impl<L> LeaveAndRejoinAction<L>
where
    L: Read<u8> + Write<u8>,
{
    /// Creates a [`LeaveAndRejoinAction`] bound to `parent`.
    #[must_use]
    pub fn new(parent: Rc<RefCell<ZigbeeRouter<L>>>) -> Self {
        Self { parent }
    }
}

impl<L> RouterAction<L::Error> for LeaveAndRejoinAction<L>
where
    L: Read<u8> + Write<u8>,
{
    fn trigger(&self) -> Result<(), LinkError<L::Error>> {
        self.parent.borrow_mut().leave_and_rejoin()
    }
}

/// Errors that may occur while dispatching a named command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError<E> {
    /// No command is registered under the given name.
    UnknownCommand,
    /// The command write failed.
    Link(LinkError<E>),
}

impl<E> From<LinkError<E>> for DispatchError<E> {
    fn from(e: LinkError<E>) -> Self {
        DispatchError::Link(e)
    }
}

/// A named-command dispatch table.
///
/// Maps the string keys of a host automation layer to actions bound to a
/// specific driver instance.
pub struct CommandRegistry<E> {
    actions: HashMap<&'static str, Box<dyn RouterAction<E>>>,
}

impl<E> CommandRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Creates a registry with both module commands bound to `router`.
    #[must_use]
    pub fn for_router<L>(router: Rc<RefCell<ZigbeeRouter<L>>>) -> Self
    where
        L: Read<u8> + Write<u8> + ErrorType<Error = E> + 'static,
    {
        let mut registry = Self::new();

        // The two names are distinct, registration cannot fail.
        let _ = registry.register(
            Command::Reset.name(),
            Box::new(ResetAction::new(Rc::clone(&router))),
        );
        let _ = registry.register(
            Command::LeaveAndRejoin.name(),
            Box::new(LeaveAndRejoinAction::new(router)),
        );

        registry
    }

    /// Registers `action` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateCommand`] if the name is already
    /// taken; the existing action is left in place.
    pub fn register(
        &mut self,
        name: &'static str,
        action: Box<dyn RouterAction<E>>,
    ) -> Result<(), ConfigError> {
        if self.actions.contains_key(name) {
            return Err(ConfigError::DuplicateCommand);
        }

        let _ = self.actions.insert(name, action);

        Ok(())
    }

    /// Invokes the command registered under `name`.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::UnknownCommand`] for an unregistered name.
    /// - [`DispatchError::Link`] if the command write fails.
    pub fn trigger(&self, name: &str) -> Result<(), DispatchError<E>> {
        let action = self
            .actions
            .get(name)
            .ok_or(DispatchError::UnknownCommand)?;
        action.trigger()?;

        Ok(())
    }

    /// Returns the registered command names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.keys().copied()
    }
}

impl<E> Default for CommandRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
