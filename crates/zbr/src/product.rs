//! The product identification a host reports to its router module.

use alloc::borrow::Cow;
use alloc::vec::Vec;

use serde::Serialize;

/// Default product identifier.
pub const DEFAULT_PRODUCT_ID: &str = "T-ZB-RT";
/// Default host firmware version.
pub const DEFAULT_MCU_VERSION: &str = "1.0.0";

/// The product identification answered to a
/// [`QUERY_PRODUCT_INFO`](crate::command::QUERY_PRODUCT_INFO) frame.
///
/// The module expects a short JSON object: the product identifier under
/// `p`, the host firmware version under `v`, and a gateway capability flag
/// under `g`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct ProductInfo {
    /// Product identifier.
    #[serde(rename = "p")]
    pub product_id: Cow<'static, str>,
    /// Host firmware version.
    #[serde(rename = "v")]
    pub mcu_version: Cow<'static, str>,
    /// Gateway capability flag.
    #[serde(rename = "g")]
    pub gateway: u8,
}

impl Default for ProductInfo {
    fn default() -> Self {
        Self {
            product_id: Cow::Borrowed(DEFAULT_PRODUCT_ID),
            mcu_version: Cow::Borrowed(DEFAULT_MCU_VERSION),
            gateway: 1,
        }
    }
}

impl ProductInfo {
    /// Serializes the identification into the frame payload bytes.
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        // A struct of plain strings and integers cannot fail to serialize.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
