use std::sync::Arc;

use chrono::FixedOffset;
use tracing::{debug, info};

use super::{BoxFuture, HttpTransport, Provider, ProviderError, post_form};
use crate::domain::{
    CallbackQuery, CallbackReply, Credentials, Credit, OutboundMessage, ProviderId,
    ProviderProfile, SendResult, VendorType,
};
use crate::transport::mitake;

/// Mitake account adapter.
pub(crate) struct MitakeProvider {
    id: ProviderId,
    credentials: Credentials,
    send_endpoint: String,
    credit_endpoint: String,
    callback_url: Option<String>,
    zone: FixedOffset,
    http: Arc<dyn HttpTransport>,
}

impl MitakeProvider {
    pub(crate) fn new(
        profile: &ProviderProfile,
        http: Arc<dyn HttpTransport>,
        zone: FixedOffset,
    ) -> Self {
        Self {
            id: profile.id.clone(),
            credentials: profile.credentials.clone(),
            send_endpoint: format!(
                "{}?{}",
                profile.endpoint(mitake::SEND_PATH),
                mitake::SEND_CHARSET_QUERY
            ),
            credit_endpoint: profile.endpoint(mitake::CREDIT_PATH),
            callback_url: profile.callback_url.as_ref().map(|url| url.to_string()),
            zone,
            http,
        }
    }
}

impl Provider for MitakeProvider {
    fn vendor(&self) -> VendorType {
        VendorType::Mitake
    }

    fn send<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, Result<SendResult, ProviderError>> {
        Box::pin(async move {
            let params =
                mitake::encode_send_form(&self.credentials, message, self.callback_url.as_deref());
            let body = post_form(self.http.as_ref(), &self.send_endpoint, params).await?;
            let result = mitake::decode_send_response(&body)?;

            info!(
                provider = %self.id,
                recipient = message.recipient().raw(),
                msgid = %result.vendor_message_id,
                credit = result.remaining_credit,
                "sent successfully"
            );
            Ok(result)
        })
    }

    fn credit(&self) -> BoxFuture<'_, Result<Credit, ProviderError>> {
        Box::pin(async move {
            let params = mitake::encode_credit_form(&self.credentials);
            let body = post_form(self.http.as_ref(), &self.credit_endpoint, params).await?;
            let credit = mitake::decode_credit_response(&body)?;

            info!(provider = %self.id, credit = credit.value(), "credit updated");
            Ok(credit)
        })
    }

    fn callback(&self, query: &CallbackQuery) -> Result<CallbackReply, ProviderError> {
        let event = mitake::decode_callback(query, self.zone)?;
        debug!(provider = %self.id, msgid = event.message_id(), "delivery report decoded");
        let ack = mitake::callback_ack(event.message_id());
        Ok(CallbackReply { event, ack })
    }
}
