//! Client layer: the vendor adapter contract and its HTTP-backed implementations.

mod every8d;
#[cfg(test)]
pub(crate) mod fake;
mod mitake;

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;

use crate::domain::{
    CallbackQuery, CallbackReply, Credit, OutboundMessage, ProviderProfile, SendResult, VendorType,
};
use crate::transport::{CallbackError, DecodeError};

pub(crate) use every8d::Every8dProvider;
pub(crate) use mitake::MitakeProvider;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub(crate) status: u16,
    pub(crate) body: String,
}

pub(crate) trait HttpTransport: Send + Sync {
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        params: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>>;
}

#[derive(Debug, Clone)]
pub(crate) struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client whose every request is bounded by `timeout`.
    pub(crate) fn new(
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        params: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
        Box::pin(async move {
            let response = self.client.post(url).form(&params).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

/// The capability set every vendor integration provides.
///
/// `send` and `credit` talk to the vendor over HTTP; `callback` only decodes a webhook the
/// vendor already delivered, so it is synchronous.
pub trait Provider: Send + Sync {
    fn vendor(&self) -> VendorType;

    /// Submit one message. A single attempt: no retries happen at this level.
    fn send<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, Result<SendResult, ProviderError>>;

    fn credit(&self) -> BoxFuture<'_, Result<Credit, ProviderError>>;

    /// Decode a delivery-status webhook into an event and the acknowledgement body the vendor
    /// expects in return.
    fn callback(&self, query: &CallbackQuery) -> Result<CallbackReply, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by a single [`Provider`] call.
///
/// [`ProviderError::Transport`] and [`ProviderError::HttpStatus`] are both transport-level
/// failures (see [`ProviderError::is_transport`]); the remaining variants mean the vendor was
/// reached.
pub enum ProviderError {
    /// HTTP client failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// Non-successful HTTP status code returned by the vendor.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// The vendor answered with a structured error; `message` is passed through verbatim.
    #[error("vendor rejected the request: {message}")]
    VendorRejected { message: String },

    /// The response body did not have the expected line/field shape.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// A webhook was missing a required parameter or carried an unparsable one.
    #[error("invalid callback: {0}")]
    InvalidCallback(#[from] CallbackError),
}

impl ProviderError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }
}

impl From<DecodeError> for ProviderError {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::Rejected { message } => Self::VendorRejected { message },
            DecodeError::Malformed { reason } => Self::MalformedResponse { reason },
        }
    }
}

/// Build the adapter matching `profile.vendor`.
pub(crate) fn connect(
    profile: &ProviderProfile,
    http: Arc<dyn HttpTransport>,
    zone: FixedOffset,
) -> Arc<dyn Provider> {
    match profile.vendor {
        VendorType::Every8d => Arc::new(Every8dProvider::new(profile, http, zone)),
        VendorType::Mitake => Arc::new(MitakeProvider::new(profile, http, zone)),
    }
}

/// POST a form and return the body of a 2xx response.
async fn post_form(
    http: &dyn HttpTransport,
    url: &str,
    params: Vec<(String, String)>,
) -> Result<String, ProviderError> {
    let response = http
        .post_form(url, params)
        .await
        .map_err(ProviderError::Transport)?;

    if !(200..=299).contains(&response.status) {
        let body = if response.body.trim().is_empty() {
            None
        } else {
            Some(response.body)
        };
        return Err(ProviderError::HttpStatus {
            status: response.status,
            body,
        });
    }

    Ok(response.body)
}
