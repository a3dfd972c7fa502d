//! SDK configuration
//!
//! Values are usually loaded by `intelligence_infra::config::ConfigLoader`
//! from a JSON/TOML file or `INTELLIGENCE_*` environment variables; hosts may
//! also build a [`Configuration`] directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{ConfigurationErrorKind, IntelligenceError};

/// Data centre region hosting the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    Europe,
    UnitedStates,
    Singapore,
    Australia,
}

impl Region {
    /// Short code used in configuration files.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Europe => "EU",
            Self::UnitedStates => "US",
            Self::Singapore => "SG",
            Self::Australia => "AU",
        }
    }

    /// Top-level domain suffix of the region's endpoints.
    #[must_use]
    pub const fn domain_extension(self) -> &'static str {
        match self {
            Self::Europe => "eu",
            Self::UnitedStates => "com",
            Self::Singapore => "com.sg",
            Self::Australia => "com.au",
        }
    }
}

/// Backend deployment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    Production,
    Uat,
    Staging,
    Integration,
    Development,
    Local,
}

impl Environment {
    /// Name used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Uat => "uat",
            Self::Staging => "staging",
            Self::Integration => "integration",
            Self::Development => "development",
            Self::Local => "local",
        }
    }

    /// Host suffix appended to the module name; empty for production.
    #[must_use]
    pub const fn host_suffix(self) -> &'static str {
        match self {
            Self::Production => "",
            Self::Uat => "-uat",
            Self::Staging => "-staging",
            Self::Integration => "-int",
            Self::Development => "-dev",
            Self::Local => "-local",
        }
    }
}

/// Which TLS certificates the transport accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CertificateTrustPolicy {
    /// Only certificates with a valid chain.
    #[default]
    Valid,
    /// Any certificate, including self-signed ones.
    Any,
    /// Any certificate outside production; valid ones only in production.
    AnyNonProduction,
}

impl CertificateTrustPolicy {
    /// Name used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Any => "any",
            Self::AnyNonProduction => "any_non_production",
        }
    }
}

/// Backend service a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Authentication,
    Identity,
    Analytics,
    Location,
}

impl Module {
    /// Host prefix of the module's endpoints.
    #[must_use]
    pub const fn host_name(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Identity => "identity",
            Self::Analytics => "analytics",
            Self::Location => "location",
        }
    }
}

macro_rules! impl_named_enum {
    ($ty:ty, $name:ident, [$($variant:ident),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = IntelligenceError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                $(
                    if trimmed.eq_ignore_ascii_case(Self::$variant.$name()) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(IntelligenceError::configuration(
                    ConfigurationErrorKind::InvalidProperty,
                    format!("'{value}' is not a valid {}", stringify!($ty)),
                ))
            }
        }

        impl TryFrom<String> for $ty {
            type Error = IntelligenceError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.$name().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.$name())
            }
        }
    };
}

impl_named_enum!(Region, code, [Europe, UnitedStates, Singapore, Australia]);
impl_named_enum!(
    Environment,
    name,
    [Production, Uat, Staging, Integration, Development, Local]
);
impl_named_enum!(CertificateTrustPolicy, name, [Valid, Any, AnyNonProduction]);

/// Tenant and deployment settings for one SDK instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub region: Region,
    pub environment: Environment,
    pub client_id: String,
    pub client_secret: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub project_id: i64,
    #[serde(deserialize_with = "deserialize_id")]
    pub application_id: i64,
    #[serde(deserialize_with = "deserialize_id")]
    pub company_id: i64,
    #[serde(deserialize_with = "deserialize_id")]
    pub sdk_user_role: i64,
    pub certificate_trust_policy: CertificateTrustPolicy,
    #[serde(default = "default_use_geofences")]
    pub use_geofences: bool,
    /// Overrides the regional host scheme; every module is then served from
    /// `{base_url}/{module}/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

const fn default_use_geofences() -> bool {
    true
}

/// Accepts ids written either as numbers or as numeric strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(value) => Ok(value),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("'{text}' is not an integer"))),
    }
}

impl Configuration {
    /// Check that every property holds a usable value.
    ///
    /// # Errors
    /// `Configuration(MissingProperty)` for blank credentials and
    /// `Configuration(InvalidProperty)` for non-positive ids or a malformed
    /// base URL.
    pub fn validate(&self) -> crate::Result<()> {
        for (key, value) in [("client_id", &self.client_id), ("client_secret", &self.client_secret)]
        {
            if value.trim().is_empty() {
                return Err(IntelligenceError::configuration(
                    ConfigurationErrorKind::MissingProperty,
                    format!("{key} must not be empty"),
                ));
            }
        }

        for (key, value) in [
            ("project_id", self.project_id),
            ("application_id", self.application_id),
            ("company_id", self.company_id),
            ("sdk_user_role", self.sdk_user_role),
        ] {
            if value <= 0 {
                return Err(IntelligenceError::configuration(
                    ConfigurationErrorKind::InvalidProperty,
                    format!("{key} must be a positive integer"),
                ));
            }
        }

        if let Some(base_url) = &self.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(IntelligenceError::configuration(
                    ConfigurationErrorKind::InvalidProperty,
                    format!("base_url '{base_url}' must be an http(s) URL"),
                ));
            }
        }

        Ok(())
    }

    /// Root URL of `module`, always ending in `/`.
    #[must_use]
    pub fn base_url(&self, module: Module) -> String {
        match &self.base_url {
            Some(root) => format!("{}/{}/", root.trim_end_matches('/'), module.host_name()),
            None => format!(
                "https://{}{}.phoenixplatform.{}/v2/",
                module.host_name(),
                self.environment.host_suffix(),
                self.region.domain_extension()
            ),
        }
    }

    /// Full URL of `path` under `module`.
    #[must_use]
    pub fn endpoint(&self, module: Module, path: &str) -> String {
        format!("{}{}", self.base_url(module), path.trim_start_matches('/'))
    }

    /// Whether the transport should skip certificate chain validation.
    #[must_use]
    pub fn accepts_invalid_certificates(&self) -> bool {
        match self.certificate_trust_policy {
            CertificateTrustPolicy::Valid => false,
            CertificateTrustPolicy::Any => true,
            CertificateTrustPolicy::AnyNonProduction => {
                self.environment != Environment::Production
            }
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("region", &self.region)
            .field("environment", &self.environment)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("application_id", &self.application_id)
            .field("company_id", &self.company_id)
            .field("sdk_user_role", &self.sdk_user_role)
            .field("certificate_trust_policy", &self.certificate_trust_policy)
            .field("use_geofences", &self.use_geofences)
            .field("base_url", &self.base_url)
            .finish()
    }
}
