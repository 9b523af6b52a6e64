//! Domain layer: strong types with validation and invariants (no I/O).

mod profile;
mod request;
mod response;
mod validation;
mod value;

pub use profile::{Credentials, ProviderProfile, Role, VendorType};
pub use request::{CallbackQuery, OutboundMessage};
pub use response::{CallbackReply, DeliveryEvent, SendResult};
pub use validation::ValidationError;
pub use value::{Credit, MessageText, Password, ProviderId, RawPhoneNumber, Username};
