//! Mitake: form-encoded requests, multi-line `key=value` responses.

use chrono::FixedOffset;

use super::timestamp::timestamp_param;
use super::{CallbackError, DecodeError};
use crate::domain::{
    CallbackQuery, Credentials, Credit, DeliveryEvent, OutboundMessage, SendResult,
};

pub const SEND_PATH: &str = "/SmSend";
pub const CREDIT_PATH: &str = "/SmQuery";

/// Query flag forcing the vendor to read the form body as UTF-8.
pub const SEND_CHARSET_QUERY: &str = "CharsetURL=UTF-8";

/// Status codes of a send that the vendor accepted (queued, sent, delivered or booked).
const ACCEPTED_STATUS_CODES: [&str; 4] = ["0", "1", "2", "4"];

/// Status code of a failed credit query.
const CREDIT_FAILURE_STATUS: &str = "e";

const STATUS_PREFIX: &str = "statuscode=";
const ERROR_PREFIX: &str = "Error=";
const MSGID_PREFIX: &str = "msgid=";
const ACCOUNT_POINT_PREFIX: &str = "AccountPoint=";

pub fn encode_credit_form(credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        (
            "username".to_owned(),
            credentials.username.as_str().to_owned(),
        ),
        (
            "password".to_owned(),
            credentials.password.as_str().to_owned(),
        ),
    ]
}

/// `callback_url` becomes the per-message `response` field the vendor posts delivery
/// reports to.
pub fn encode_send_form(
    credentials: &Credentials,
    message: &OutboundMessage,
    callback_url: Option<&str>,
) -> Vec<(String, String)> {
    let mut params = encode_credit_form(credentials);
    params.push(("dstaddr".to_owned(), message.recipient().raw().to_owned()));
    params.push(("smbody".to_owned(), message.content().as_str().to_owned()));
    params.push((
        "destname".to_owned(),
        message.comment().unwrap_or_default().to_owned(),
    ));
    if let Some(url) = callback_url {
        params.push(("response".to_owned(), url.to_owned()));
    }
    params
}

pub fn decode_send_response(body: &str) -> Result<SendResult, DecodeError> {
    let mut message_id = None;
    let mut credit = None;

    let mut lines = body.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if let Some(code) = line.strip_prefix(STATUS_PREFIX) {
            if !ACCEPTED_STATUS_CODES.contains(&code) {
                return Err(rejection_from_next_line(&mut lines, code));
            }
        } else if let Some(id) = line.strip_prefix(MSGID_PREFIX) {
            message_id = Some(id.to_owned());
        } else if let Some(points) = line.strip_prefix(ACCOUNT_POINT_PREFIX) {
            credit = Some(parse_account_point(points)?);
        }
    }

    let vendor_message_id = message_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DecodeError::malformed("response has no msgid line"))?;
    let remaining_credit =
        credit.ok_or_else(|| DecodeError::malformed("response has no AccountPoint line"))?;

    Ok(SendResult {
        vendor_message_id,
        remaining_credit,
    })
}

pub fn decode_credit_response(body: &str) -> Result<Credit, DecodeError> {
    let mut lines = body.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if let Some(code) = line.strip_prefix(STATUS_PREFIX) {
            if code == CREDIT_FAILURE_STATUS {
                return Err(rejection_from_next_line(&mut lines, code));
            }
        } else if let Some(points) = line.strip_prefix(ACCOUNT_POINT_PREFIX) {
            let points = parse_account_point(points)?;
            return Credit::new(points as f64)
                .map_err(|err| DecodeError::malformed(err.to_string()));
        }
    }
    Err(DecodeError::malformed("response has no AccountPoint line"))
}

pub fn decode_callback(
    query: &CallbackQuery,
    zone: FixedOffset,
) -> Result<DeliveryEvent, CallbackError> {
    let message_id = query
        .get_non_empty("msgid")
        .ok_or(CallbackError::MissingParameter { name: "msgid" })?;
    let recipient = international_recipient(query.get("dstaddr").unwrap_or_default());
    let status = query.get("statusstr").unwrap_or_default();
    let sent_at = timestamp_param(query, "dlvtime", zone)?;
    let delivered_at = timestamp_param(query, "donetime", zone)?;

    Ok(DeliveryEvent::new(
        message_id,
        recipient,
        status,
        sent_at,
        delivered_at,
    )?)
}

/// Body Mitake expects back from a delivery-report webhook.
pub fn callback_ack(message_id: &str) -> String {
    format!("magicid=sms_gateway_rpack\nmsgid={message_id}\n")
}

/// Rewrite a Taiwanese mobile number from local `09…` to `+8869…` notation.
fn international_recipient(raw: &str) -> String {
    match raw.trim().strip_prefix("09") {
        Some(rest) => format!("+8869{rest}"),
        None => raw.trim().to_owned(),
    }
}

fn rejection_from_next_line<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    code: &str,
) -> DecodeError {
    match lines.next() {
        Some(line) => DecodeError::Rejected {
            message: line.strip_prefix(ERROR_PREFIX).unwrap_or(line).to_owned(),
        },
        None => DecodeError::malformed(format!(
            "statuscode={code} without a following Error line"
        )),
    }
}

fn parse_account_point(raw: &str) -> Result<u64, DecodeError> {
    raw.trim().parse::<u64>().map_err(|_| {
        DecodeError::malformed(format!(
            "AccountPoint is not a non-negative integer: {raw:?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::domain::{MessageText, Password, RawPhoneNumber, Username};

    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            username: Username::new("acct").unwrap(),
            password: Password::new("secret").unwrap(),
        }
    }

    fn taipei() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn encode_send_form_params() {
        let msg = OutboundMessage::new(
            RawPhoneNumber::new("0912345678").unwrap(),
            MessageText::new("你好").unwrap(),
        );

        assert_eq!(
            encode_send_form(&credentials(), &msg, Some("https://hooks.example.com/mitake")),
            vec![
                ("username".to_owned(), "acct".to_owned()),
                ("password".to_owned(), "secret".to_owned()),
                ("dstaddr".to_owned(), "0912345678".to_owned()),
                ("smbody".to_owned(), "你好".to_owned()),
                ("destname".to_owned(), String::new()),
                (
                    "response".to_owned(),
                    "https://hooks.example.com/mitake".to_owned()
                ),
            ]
        );

        let params = encode_send_form(&credentials(), &msg, None);
        assert!(!params.iter().any(|(k, _)| k == "response"));
    }

    #[test]
    fn decode_send_success() {
        let result = decode_send_response("statuscode=0\nmsgid=M1\nAccountPoint=50").unwrap();
        assert_eq!(
            result,
            SendResult {
                vendor_message_id: "M1".to_owned(),
                remaining_credit: 50,
            }
        );
    }

    #[test]
    fn decode_send_tolerates_crlf_and_batch_markers() {
        let body = "[1]\r\nmsgid=#000000123\r\nstatuscode=1\r\nAccountPoint=97\r\n";
        let result = decode_send_response(body).unwrap();
        assert_eq!(result.vendor_message_id, "#000000123");
        assert_eq!(result.remaining_credit, 97);
    }

    #[test]
    fn decode_send_rejected_status_uses_next_error_line() {
        let err = decode_send_response("statuscode=3\nError=Account locked").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Rejected {
                message: "Account locked".to_owned()
            }
        );

        let err = decode_send_response("statuscode=k\nError=Invalid recipient\nAccountPoint=5")
            .unwrap_err();
        assert!(matches!(err, DecodeError::Rejected { .. }));
    }

    #[test]
    fn decode_send_accepts_each_success_code() {
        for code in ACCEPTED_STATUS_CODES {
            let body = format!("msgid=M1\nstatuscode={code}\nAccountPoint=1");
            assert!(decode_send_response(&body).is_ok(), "{code}");
        }
        // Membership is exact, not a character match.
        let err = decode_send_response("statuscode=10\nError=nope").unwrap_err();
        assert!(matches!(err, DecodeError::Rejected { .. }));
    }

    #[test]
    fn decode_send_shape_errors_are_malformed() {
        for body in [
            "",
            "statuscode=5",
            "statuscode=1\nAccountPoint=5",
            "statuscode=1\nmsgid=M1",
            "statuscode=1\nmsgid=M1\nAccountPoint=abc",
        ] {
            let err = decode_send_response(body).unwrap_err();
            assert!(matches!(err, DecodeError::Malformed { .. }), "{body:?}");
        }
    }

    #[test]
    fn decode_credit_reads_account_point() {
        assert_eq!(decode_credit_response("AccountPoint=120").unwrap().value(), 120.0);
        assert_eq!(
            decode_credit_response("statuscode=0\r\nAccountPoint=7\r\n")
                .unwrap()
                .value(),
            7.0
        );
    }

    #[test]
    fn decode_credit_failure_status_is_rejection() {
        let err = decode_credit_response("statuscode=e\nError=Password incorrect").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Rejected {
                message: "Password incorrect".to_owned()
            }
        );
        assert!(matches!(
            decode_credit_response("statuscode=e").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
        assert!(matches!(
            decode_credit_response("AccountPoint=-3").unwrap_err(),
            DecodeError::Malformed { .. }
        ));
    }

    #[test]
    fn decode_callback_builds_event_with_international_recipient() {
        let query = CallbackQuery::from_pairs([
            ("msgid", "M1"),
            ("dstaddr", "0912345678"),
            ("statusstr", "DELIVRD"),
            ("dlvtime", "20240101000000"),
            ("donetime", "20240101000005"),
        ]);
        let event = decode_callback(&query, taipei()).unwrap();
        assert_eq!(event.message_id(), "M1");
        assert_eq!(event.recipient(), "+886912345678");
        assert_eq!(event.status_code(), "DELIVRD");
        assert_eq!(event.delay(), Duration::from_secs(5));
    }

    #[test]
    fn international_recipient_only_rewrites_leading_prefix() {
        assert_eq!(international_recipient("0912345678"), "+886912345678");
        assert_eq!(international_recipient("+886912345678"), "+886912345678");
        assert_eq!(international_recipient("0221234509"), "0221234509");
    }

    #[test]
    fn decode_callback_requires_msgid() {
        let query = CallbackQuery::from_pairs([
            ("dstaddr", "0912345678"),
            ("dlvtime", "20240101000000"),
            ("donetime", "20240101000005"),
        ]);
        assert_eq!(
            decode_callback(&query, taipei()).unwrap_err(),
            CallbackError::MissingParameter { name: "msgid" }
        );
    }

    #[test]
    fn decode_callback_rejects_bad_done_time() {
        let query = CallbackQuery::from_pairs([
            ("msgid", "M1"),
            ("dlvtime", "20240101000000"),
            ("donetime", "soon"),
        ]);
        assert!(matches!(
            decode_callback(&query, taipei()).unwrap_err(),
            CallbackError::InvalidTimestamp {
                name: "donetime",
                ..
            }
        ));
    }

    #[test]
    fn callback_ack_is_two_line_body() {
        assert_eq!(callback_ack("M1"), "magicid=sms_gateway_rpack\nmsgid=M1\n");
    }
}
