//! Configuration shapes filled by an external loader (YAML, JSON, environment, ...).

use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;
use url::Url;

use crate::dispatch::{DEFAULT_TIMEOUT, DEFAULT_VENDOR_UTC_OFFSET_SECS};
use crate::domain::{
    Credentials, Password, ProviderId, ProviderProfile, Role, Username, ValidationError,
    VendorType,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider #{index}: {source}")]
    InvalidProvider {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("provider #{index}: invalid {field}: {source}")]
    InvalidUrl {
        index: usize,
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("UTC offset out of range: {minutes} minutes")]
    InvalidUtcOffset { minutes: i32 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Offset of vendor callback timestamps from UTC.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub vendor: ConfigVendor,
    #[serde(default)]
    pub role: ConfigRole,
    pub username: String,
    pub password: String,
    pub base_url: String,
    #[serde(default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigVendor {
    Every8d,
    Mitake,
}

impl From<ConfigVendor> for VendorType {
    fn from(value: ConfigVendor) -> Self {
        match value {
            ConfigVendor::Every8d => VendorType::Every8d,
            ConfigVendor::Mitake => VendorType::Mitake,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigRole {
    Master,
    #[default]
    Backup,
}

impl From<ConfigRole> for Role {
    fn from(value: ConfigRole) -> Self {
        match value {
            ConfigRole::Master => Role::Master,
            ConfigRole::Backup => Role::Backup,
        }
    }
}

impl GatewayConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn vendor_timezone(&self) -> Result<FixedOffset, ConfigError> {
        match self.utc_offset_minutes {
            None => FixedOffset::east_opt(DEFAULT_VENDOR_UTC_OFFSET_SECS).ok_or(
                ConfigError::InvalidUtcOffset {
                    minutes: DEFAULT_VENDOR_UTC_OFFSET_SECS / 60,
                },
            ),
            Some(minutes) => minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .ok_or(ConfigError::InvalidUtcOffset { minutes }),
        }
    }

    /// Validate every provider entry, keeping the configured order.
    pub fn profiles(&self) -> Result<Vec<ProviderProfile>, ConfigError> {
        self.providers
            .iter()
            .enumerate()
            .map(|(index, provider)| provider.to_profile(index))
            .collect()
    }
}

impl ProviderConfig {
    fn to_profile(&self, index: usize) -> Result<ProviderProfile, ConfigError> {
        let invalid = |source| ConfigError::InvalidProvider { index, source };
        let url = |field, value: &str| {
            Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl {
                index,
                field,
                source,
            })
        };

        Ok(ProviderProfile {
            id: ProviderId::new(self.id.as_str()).map_err(invalid)?,
            vendor: self.vendor.into(),
            role: self.role.into(),
            credentials: Credentials {
                username: Username::new(self.username.as_str()).map_err(invalid)?,
                password: Password::new(self.password.as_str()).map_err(invalid)?,
            },
            base_url: url("baseUrl", &self.base_url)?,
            callback_url: self
                .callback_url
                .as_deref()
                .filter(|value| !value.trim().is_empty())
                .map(|value| url("callbackUrl", value))
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
    {
      "timeoutSecs": 5,
      "userAgent": "sms-dispatch/test",
      "providers": [
        {
          "id": "every8d",
          "type": "every8d",
          "role": "master",
          "username": "e8d-user",
          "password": "e8d-pass",
          "baseUrl": "https://api.every8d.example.com/API21/HTTP"
        },
        {
          "id": "mitake",
          "type": "mitake",
          "username": "mtk-user",
          "password": "mtk-pass",
          "baseUrl": "https://smsapi.mitake.example.com/api/mtk",
          "callbackUrl": "https://sms.example.com/callback/mitake"
        }
      ]
    }
    "#;

    #[test]
    fn parses_providers_in_order_with_default_role() {
        let config = GatewayConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.user_agent.as_deref(), Some("sms-dispatch/test"));

        let profiles = config.profiles().unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].id.as_str(), "every8d");
        assert_eq!(profiles[0].vendor, VendorType::Every8d);
        assert_eq!(profiles[0].role, Role::Master);
        assert_eq!(profiles[0].callback_url, None);
        assert_eq!(profiles[1].vendor, VendorType::Mitake);
        assert_eq!(profiles[1].role, Role::Backup);
        assert_eq!(
            profiles[1].callback_url.as_ref().map(Url::as_str),
            Some("https://sms.example.com/callback/mitake")
        );
    }

    #[test]
    fn defaults_timeout_and_vendor_timezone() {
        let config = GatewayConfig::from_json(r#"{ "providers": [] }"#).unwrap();
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(
            config.vendor_timezone().unwrap().local_minus_utc(),
            8 * 3600
        );
    }

    #[test]
    fn rejects_out_of_range_utc_offset() {
        let config =
            GatewayConfig::from_json(r#"{ "utcOffsetMinutes": 1500, "providers": [] }"#).unwrap();
        assert!(matches!(
            config.vendor_timezone(),
            Err(ConfigError::InvalidUtcOffset { minutes: 1500 })
        ));
    }

    #[test]
    fn rejects_unknown_vendor_type() {
        let json = r#"{ "providers": [ { "id": "x", "type": "twilio", "username": "u",
            "password": "p", "baseUrl": "https://x.example.com" } ] }"#;
        assert!(matches!(
            GatewayConfig::from_json(json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reports_invalid_entries_by_index() {
        let json = r#"{ "providers": [
            { "id": "ok", "type": "mitake", "username": "u", "password": "p",
              "baseUrl": "https://x.example.com" },
            { "id": " ", "type": "mitake", "username": "u", "password": "p",
              "baseUrl": "https://x.example.com" } ] }"#;
        let err = GatewayConfig::from_json(json).unwrap().profiles().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProvider { index: 1, .. }));

        let json = r#"{ "providers": [
            { "id": "bad", "type": "every8d", "username": "u", "password": "p",
              "baseUrl": "not a url" } ] }"#;
        let err = GatewayConfig::from_json(json).unwrap().profiles().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                index: 0,
                field: "baseUrl",
                ..
            }
        ));
    }
}
