use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub vendor_message_id: String,
    pub remaining_credit: u64,
}

/// Normalized record of a vendor's asynchronous delivery report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEvent {
    message_id: String,
    recipient: String,
    status_code: String,
    sent_at: DateTime<FixedOffset>,
    delivered_at: DateTime<FixedOffset>,
    delay: Duration,
}

impl DeliveryEvent {
    /// Build an event, deriving `delay = delivered_at - sent_at`.
    ///
    /// Rejects `delivered_at < sent_at` instead of clamping the delay to zero.
    pub fn new(
        message_id: impl Into<String>,
        recipient: impl Into<String>,
        status_code: impl Into<String>,
        sent_at: DateTime<FixedOffset>,
        delivered_at: DateTime<FixedOffset>,
    ) -> Result<Self, ValidationError> {
        let message_id = message_id.into();
        if message_id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "message_id",
            });
        }
        let delay = (delivered_at - sent_at).to_std().map_err(|_| {
            ValidationError::DeliveredBeforeSent {
                sent_at: sent_at.to_rfc3339(),
                delivered_at: delivered_at.to_rfc3339(),
            }
        })?;

        Ok(Self {
            message_id,
            recipient: recipient.into(),
            status_code: status_code.into(),
            sent_at,
            delivered_at,
            delay,
        })
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Vendor-specific status code, passed through without normalization.
    pub fn status_code(&self) -> &str {
        &self.status_code
    }

    pub fn sent_at(&self) -> DateTime<FixedOffset> {
        self.sent_at
    }

    pub fn delivered_at(&self) -> DateTime<FixedOffset> {
        self.delivered_at
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Outcome of handling one vendor webhook: the normalized event plus the body the vendor
/// expects back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackReply {
    pub event: DeliveryEvent,
    pub ack: String,
}
