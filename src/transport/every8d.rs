//! Every8D: form-encoded requests, single comma-separated response line.
//!
//! Response line layout: `credit,message,sent_count,cost,batch_id`. A negative credit means the
//! call failed and `message` carries the reason.

use chrono::FixedOffset;

use super::timestamp::timestamp_param;
use super::{CallbackError, DecodeError};
use crate::domain::{
    CallbackQuery, Credentials, Credit, DeliveryEvent, OutboundMessage, SendResult,
};

pub const SEND_PATH: &str = "/sendSMS.ashx";
pub const CREDIT_PATH: &str = "/getCredit.ashx";

/// Body Every8D expects back from a delivery-report webhook.
pub const CALLBACK_ACK: &str = "ok";

pub fn encode_credit_form(credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        ("UID".to_owned(), credentials.username.as_str().to_owned()),
        ("PWD".to_owned(), credentials.password.as_str().to_owned()),
    ]
}

pub fn encode_send_form(
    credentials: &Credentials,
    message: &OutboundMessage,
) -> Vec<(String, String)> {
    let mut params = encode_credit_form(credentials);
    params.push(("DEST".to_owned(), message.recipient().raw().to_owned()));
    params.push(("MSG".to_owned(), message.content().as_str().to_owned()));
    params.push((
        "SB".to_owned(),
        message.comment().unwrap_or_default().to_owned(),
    ));
    params
}

pub fn decode_send_response(body: &str) -> Result<SendResult, DecodeError> {
    let fields = split_fields(body);
    let credit = decode_credit_field(&fields)?;

    let batch_id = fields
        .get(4)
        .copied()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DecodeError::malformed(format!("missing batch id in {body:?}")))?;

    Ok(SendResult {
        vendor_message_id: batch_id.to_owned(),
        remaining_credit: credit.whole(),
    })
}

pub fn decode_credit_response(body: &str) -> Result<Credit, DecodeError> {
    decode_credit_field(&split_fields(body))
}

pub fn decode_callback(
    query: &CallbackQuery,
    zone: FixedOffset,
) -> Result<DeliveryEvent, CallbackError> {
    let message_id = query
        .get_non_empty("BatchID")
        .ok_or(CallbackError::MissingParameter { name: "BatchID" })?;
    let recipient = query.get("RM").unwrap_or_default();
    let status = query.get("STATUS").unwrap_or_default();
    let sent_at = timestamp_param(query, "ST", zone)?;
    let delivered_at = timestamp_param(query, "RT", zone)?;

    Ok(DeliveryEvent::new(
        message_id,
        recipient,
        status,
        sent_at,
        delivered_at,
    )?)
}

fn split_fields(body: &str) -> Vec<&str> {
    body.trim().split(',').map(str::trim).collect()
}

fn decode_credit_field(fields: &[&str]) -> Result<Credit, DecodeError> {
    let raw = fields.first().copied().unwrap_or_default();
    let value = raw
        .parse::<f64>()
        .map_err(|_| DecodeError::malformed(format!("credit field is not a number: {raw:?}")))?;

    if value < 0.0 {
        let message = fields.get(1).copied().ok_or_else(|| {
            DecodeError::malformed(format!("negative credit {value} without an error message"))
        })?;
        return Err(DecodeError::Rejected {
            message: message.to_owned(),
        });
    }

    Credit::new(value).map_err(|err| DecodeError::malformed(err.to_string()))
}
