use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Empty { field: &'static str },
    NegativeCredit { actual: f64 },
    DeliveredBeforeSent { sent_at: String, delivered_at: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::NegativeCredit { actual } => {
                write!(f, "credit must be a non-negative number: {actual}")
            }
            Self::DeliveredBeforeSent {
                sent_at,
                delivered_at,
            } => write!(
                f,
                "delivery time {delivered_at} precedes send time {sent_at}"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::ValidationError;

    #[test]
    fn display_messages_are_human_readable() {
        let err = ValidationError::Empty { field: "DEST" };
        assert_eq!(err.to_string(), "DEST must not be empty");

        let err = ValidationError::NegativeCredit { actual: -1.0 };
        assert_eq!(err.to_string(), "credit must be a non-negative number: -1");

        let err = ValidationError::DeliveredBeforeSent {
            sent_at: "2024-01-01T00:00:05+08:00".to_owned(),
            delivered_at: "2024-01-01T00:00:00+08:00".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "delivery time 2024-01-01T00:00:00+08:00 precedes send time 2024-01-01T00:00:05+08:00"
        );
    }
}
