//! SMS provider abstraction and dispatch for the Every8D and Mitake gateways.
//!
//! The crate is layered the usual way: a domain layer of validated types, a transport layer
//! for each vendor's wire quirks (form fields, comma- and line-oriented text responses,
//! webhook queries), and a client layer that talks HTTP. On top sit a [`ProviderRegistry`]
//! with one switchable master and a [`Dispatcher`] that broadcasts sends and routes delivery
//! webhooks into a [`DeliverySink`].
//!
//! ```rust,no_run
//! use sms_dispatch::{Dispatcher, DispatcherBuilder, GatewayConfig, MessageText, OutboundMessage,
//!     RawPhoneNumber};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_json(&std::fs::read_to_string("sms.json")?)?;
//!     let dispatcher: Dispatcher = DispatcherBuilder::from_config(&config)?.build()?;
//!
//!     let message = OutboundMessage::new(
//!         RawPhoneNumber::new("0912345678")?,
//!         MessageText::new("hello")?,
//!     );
//!     let broadcast = dispatcher.send(&message).await?;
//!     println!("accepted by {} provider(s)", broadcast.delivered.len());
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod registry;
pub mod sink;
pub mod transport;

pub use client::{Provider, ProviderError};
pub use config::{ConfigError, GatewayConfig};
pub use dispatch::{Broadcast, BuildError, DispatchError, Dispatcher, DispatcherBuilder};
pub use domain::{
    CallbackQuery, CallbackReply, Credentials, Credit, DeliveryEvent, MessageText,
    OutboundMessage, Password, ProviderId, ProviderProfile, RawPhoneNumber, Role, SendResult,
    Username, ValidationError, VendorType,
};
pub use registry::{ProviderRegistry, RegistryError};
pub use sink::{ChannelSink, DeliverySink, TracingSink};
pub use transport::{CallbackError, DecodeError};
