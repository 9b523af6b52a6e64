use std::fmt;

use url::Url;

use crate::domain::value::{Password, ProviderId, Username};

/// Vendor protocol a provider profile speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorType {
    Every8d,
    Mitake,
}

impl VendorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Every8d => "every8d",
            Self::Mitake => "mitake",
        }
    }
}

impl fmt::Display for VendorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory role flag. Exactly one registered provider is [`Role::Master`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Master,
    #[default]
    Backup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: Username,
    pub password: Password,
}

/// One configured vendor account.
///
/// `role` is the only field that changes at runtime, and only through
/// [`crate::ProviderRegistry::switch_master_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub id: ProviderId,
    pub vendor: VendorType,
    pub role: Role,
    pub credentials: Credentials,
    pub base_url: Url,
    /// Delivery-report URL handed to vendors that accept one per message (Mitake).
    pub callback_url: Option<Url>,
}

impl ProviderProfile {
    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }

    /// Absolute URL for a vendor path such as `/SmSend`.
    ///
    /// The path is appended to the base URL rather than resolved against it, so a base of
    /// `https://host/api/` yields `https://host/api/SmSend`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
