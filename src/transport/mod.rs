//! Transport layer: vendor wire formats (form encoding, text response decoding, webhook
//! query decoding). Nothing here performs I/O.

pub mod every8d;
pub mod mitake;
mod timestamp;

pub use timestamp::{VENDOR_TIMESTAMP_FORMAT, parse_vendor_timestamp};

use crate::domain::ValidationError;

/// Failure to turn a vendor response body into a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The vendor answered with a structured error; `message` is its text verbatim.
    #[error("vendor rejected the request: {message}")]
    Rejected { message: String },

    #[error("malformed response: {reason}")]
    Malformed { reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Failure to turn webhook query parameters into a delivery event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallbackError {
    #[error("missing required query parameter `{name}`")]
    MissingParameter { name: &'static str },

    #[error("query parameter `{name}` is not a YYYYMMDDhhmmss timestamp: {value:?}")]
    InvalidTimestamp { name: &'static str, value: String },

    #[error("invalid delivery event: {0}")]
    Invalid(#[from] ValidationError),
}
