use std::sync::Arc;

use chrono::FixedOffset;
use tracing::{debug, info};

use super::{BoxFuture, HttpTransport, Provider, ProviderError, post_form};
use crate::domain::{
    CallbackQuery, CallbackReply, Credentials, Credit, OutboundMessage, ProviderId,
    ProviderProfile, SendResult, VendorType,
};
use crate::transport::every8d;

/// Every8D account adapter.
pub(crate) struct Every8dProvider {
    id: ProviderId,
    credentials: Credentials,
    send_endpoint: String,
    credit_endpoint: String,
    zone: FixedOffset,
    http: Arc<dyn HttpTransport>,
}

impl Every8dProvider {
    pub(crate) fn new(
        profile: &ProviderProfile,
        http: Arc<dyn HttpTransport>,
        zone: FixedOffset,
    ) -> Self {
        Self {
            id: profile.id.clone(),
            credentials: profile.credentials.clone(),
            send_endpoint: profile.endpoint(every8d::SEND_PATH),
            credit_endpoint: profile.endpoint(every8d::CREDIT_PATH),
            zone,
            http,
        }
    }
}

impl Provider for Every8dProvider {
    fn vendor(&self) -> VendorType {
        VendorType::Every8d
    }

    fn send<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, Result<SendResult, ProviderError>> {
        Box::pin(async move {
            let params = every8d::encode_send_form(&self.credentials, message);
            let body = post_form(self.http.as_ref(), &self.send_endpoint, params).await?;
            let result = every8d::decode_send_response(&body)?;

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
            let params = every8d::encode_credit_form(&self.credentials);
            let body = post_form(self.http.as_ref(), &self.credit_endpoint, params).await?;
            let credit = every8d::decode_credit_response(&body)?;

            info!(provider = %self.id, credit = credit.value(), "credit updated");
            Ok(credit)
        })
    }

    fn callback(&self, query: &CallbackQuery) -> Result<CallbackReply, ProviderError> {
        let event = every8d::decode_callback(query, self.zone)?;
        debug!(provider = %self.id, msgid = event.message_id(), "delivery report decoded");
        Ok(CallbackReply {
            event,
            ack: every8d::CALLBACK_ACK.to_owned(),
        })
    }
}
