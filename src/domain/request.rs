use crate::domain::value::{MessageText, RawPhoneNumber};

/// A single SMS to deliver, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    recipient: RawPhoneNumber,
    content: MessageText,
    comment: Option<String>,
}

impl OutboundMessage {
    pub fn new(recipient: RawPhoneNumber, content: MessageText) -> Self {
        Self {
            recipient,
            content,
            comment: None,
        }
    }

    /// Attach a free-text tag the vendor stores alongside the message.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = if comment.trim().is_empty() {
            None
        } else {
            Some(comment)
        };
        self
    }

    pub fn recipient(&self) -> &RawPhoneNumber {
        &self.recipient
    }

    pub fn content(&self) -> &MessageText {
        &self.content
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// Raw query parameters of a vendor delivery-status webhook.
///
/// Lookups return the first value for a key, matching how the vendors send each parameter once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    pairs: Vec<(String, String)>,
}

impl CallbackQuery {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Decode an `application/x-www-form-urlencoded` query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First value for `key`, treating an empty or blank value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }
}
