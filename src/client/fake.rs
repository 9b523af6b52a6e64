//! In-memory [`HttpTransport`] for tests: canned responses per URL, every request recorded.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::{Arc, Mutex};

use url::Url;

use super::{BoxFuture, HttpResponse, HttpTransport};
use crate::domain::{
    Credentials, Password, ProviderId, ProviderProfile, Role, Username, VendorType,
};

#[derive(Debug, Clone)]
enum Canned {
    Response { status: u16, body: String },
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub(crate) url: String,
    pub(crate) params: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTransport {
    state: Arc<Mutex<FakeTransportState>>,
}

#[derive(Debug, Default)]
struct FakeTransportState {
    routes: HashMap<String, Canned>,
    requests: Vec<RecordedRequest>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &str, status: u16, body: impl Into<String>) {
        self.state.lock().unwrap().routes.insert(
            url.to_owned(),
            Canned::Response {
                status,
                body: body.into(),
            },
        );
    }

    pub(crate) fn fail(&self, url: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(url.to_owned(), Canned::Failure(message.to_owned()));
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl HttpTransport for FakeTransport {
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        params: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
        Box::pin(async move {
            let canned = {
                let mut state = self.state.lock().unwrap();
                state.requests.push(RecordedRequest {
                    url: url.to_owned(),
                    params,
                });
                state.routes.get(url).cloned()
            };
            match canned {
                Some(Canned::Response { status, body }) => Ok(HttpResponse { status, body }),
                Some(Canned::Failure(message)) => Err(message.into()),
                None => Err(format!("no route for {url}").into()),
            }
        })
    }
}

pub(crate) fn assert_param(params: &[(String, String)], key: &str, value: &str) {
    assert!(
        params.iter().any(|(k, v)| k == key && v == value),
        "missing param {key}={value}; got: {params:?}"
    );
}

/// Profile whose base URL is `https://{id}.example.invalid`.
pub(crate) fn profile(id: &str, vendor: VendorType, role: Role) -> ProviderProfile {
    ProviderProfile {
        id: ProviderId::new(id).unwrap(),
        vendor,
        role,
        credentials: Credentials {
            username: Username::new(format!("{id}-user")).unwrap(),
            password: Password::new(format!("{id}-pass")).unwrap(),
        },
        base_url: Url::parse(&format!("https://{id}.example.invalid")).unwrap(),
        callback_url: Some(Url::parse(&format!("https://hooks.example.invalid/{id}")).unwrap()),
    }
}
