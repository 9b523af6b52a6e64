use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use super::CallbackError;
use crate::domain::CallbackQuery;

/// `YYYYMMDDhhmmss`, the layout both vendors use in delivery reports.
pub const VENDOR_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Parse a vendor wall-clock timestamp in the given zone.
///
/// Only the exact 14-digit layout is accepted.
pub fn parse_vendor_timestamp(value: &str, zone: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(value, VENDOR_TIMESTAMP_FORMAT).ok()?;
    zone.from_local_datetime(&naive).single()
}

pub(crate) fn timestamp_param(
    query: &CallbackQuery,
    name: &'static str,
    zone: FixedOffset,
) -> Result<DateTime<FixedOffset>, CallbackError> {
    let value = query.get(name).unwrap_or_default();
    parse_vendor_timestamp(value, zone).ok_or_else(|| CallbackError::InvalidTimestamp {
        name,
        value: value.to_owned(),
    })
}
