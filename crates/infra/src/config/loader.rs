//! Configuration loader
//!
//! Loads SDK configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file into the process environment, if present
//! 2. Attempts to load from `INTELLIGENCE_*` environment variables
//! 3. If incomplete, falls back to a JSON or TOML file
//! 4. Probes multiple paths for config files
//!
//! ## Environment Variables
//! - `INTELLIGENCE_REGION`: `EU`, `US`, `SG` or `AU`
//! - `INTELLIGENCE_ENVIRONMENT`: `production`, `uat`, `staging`, `integration`,
//!   `development` or `local`
//! - `INTELLIGENCE_CLIENT_ID`, `INTELLIGENCE_CLIENT_SECRET`
//! - `INTELLIGENCE_PROJECT_ID`, `INTELLIGENCE_APPLICATION_ID`,
//!   `INTELLIGENCE_COMPANY_ID`, `INTELLIGENCE_SDK_USER_ROLE`
//! - `INTELLIGENCE_CERTIFICATE_TRUST_POLICY` (optional, default `valid`)
//! - `INTELLIGENCE_USE_GEOFENCES` (optional, default `true`)
//! - `INTELLIGENCE_BASE_URL` (optional)
//!
//! ## File Locations
//! The loader probes `intelligence.{json,toml}` and `config.{json,toml}` in
//! the current directory and its two parents, then next to the executable.

use std::path::{Path, PathBuf};

use intelligence_domain::{
    CertificateTrustPolicy, Configuration, ConfigurationErrorKind, IntelligenceError, Result,
};
use url::Url;

use crate::errors::InfraError;

const FILE_STEMS: [&str; 2] = ["intelligence", "config"];
const EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// `Configuration(..)` when neither source yields a valid configuration.
pub fn load() -> Result<Configuration> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `INTELLIGENCE_*` environment variables
///
/// # Errors
/// `MissingProperty` for absent required variables, `InvalidProperty` for
/// values that do not parse or fail validation.
pub fn load_from_env() -> Result<Configuration> {
    let certificate_trust_policy = match optional_env("INTELLIGENCE_CERTIFICATE_TRUST_POLICY") {
        Some(value) => value.parse()?,
        None => CertificateTrustPolicy::default(),
    };

    let config = Configuration {
        region: env_var("INTELLIGENCE_REGION")?.parse()?,
        environment: env_var("INTELLIGENCE_ENVIRONMENT")?.parse()?,
        client_id: env_var("INTELLIGENCE_CLIENT_ID")?,
        client_secret: env_var("INTELLIGENCE_CLIENT_SECRET")?,
        project_id: env_id("INTELLIGENCE_PROJECT_ID")?,
        application_id: env_id("INTELLIGENCE_APPLICATION_ID")?,
        company_id: env_id("INTELLIGENCE_COMPANY_ID")?,
        sdk_user_role: env_id("INTELLIGENCE_SDK_USER_ROLE")?,
        certificate_trust_policy,
        use_geofences: env_bool("INTELLIGENCE_USE_GEOFENCES", true),
        base_url: optional_env("INTELLIGENCE_BASE_URL"),
    };

    finish(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. The format is picked
/// by extension.
///
/// # Errors
/// `FileNotFound` when no file exists, `InvalidFile` for unreadable or
/// malformed files, `MissingProperty`/`InvalidProperty` for bad contents.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Configuration> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(IntelligenceError::configuration(
                    ConfigurationErrorKind::FileNotFound,
                    format!("Config file not found: {}", p.display()),
                ));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            IntelligenceError::configuration(
                ConfigurationErrorKind::FileNotFound,
                "No config file found in any of the standard locations",
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| IntelligenceError::from(InfraError::from(e)))?;

    parse_config(&contents, &config_path)
}

/// Parse and validate configuration text
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// See [`load_from_file`].
pub fn parse_config(contents: &str, path: &Path) -> Result<Configuration> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let config: Configuration = match extension {
        "toml" => toml::from_str(contents).map_err(|e| deserialize_error("TOML", &e.to_string()))?,
        "json" => {
            serde_json::from_str(contents).map_err(|e| deserialize_error("JSON", &e.to_string()))?
        }
        _ => {
            return Err(IntelligenceError::configuration(
                ConfigurationErrorKind::InvalidFile,
                format!("Unsupported config format: {extension}"),
            ))
        }
    };

    finish(config)
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| {
            FILE_STEMS.iter().flat_map(move |stem| {
                EXTENSIONS.iter().map(move |ext| root.join(format!("{stem}.{ext}")))
            })
        })
        .find(|path| path.exists())
}

/// Validate and normalise a parsed configuration.
fn finish(mut config: Configuration) -> Result<Configuration> {
    if let Some(base_url) = config.base_url.take() {
        let parsed = Url::parse(base_url.trim()).map_err(|e| {
            IntelligenceError::configuration(
                ConfigurationErrorKind::InvalidProperty,
                format!("Invalid base_url '{base_url}': {e}"),
            )
        })?;
        config.base_url = Some(parsed.as_str().trim_end_matches('/').to_string());
    }

    config.validate()?;
    Ok(config)
}

fn deserialize_error(format: &str, message: &str) -> IntelligenceError {
    let kind = if message.contains("missing field") {
        ConfigurationErrorKind::MissingProperty
    } else if message.contains("is not a valid") || message.contains("is not an integer") {
        ConfigurationErrorKind::InvalidProperty
    } else {
        ConfigurationErrorKind::InvalidFile
    };
    IntelligenceError::configuration(kind, format!("Invalid {format} format: {message}"))
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        IntelligenceError::configuration(
            ConfigurationErrorKind::MissingProperty,
            format!("Missing required environment variable: {key}"),
        )
    })
}

/// Environment variable, treating blank values as unset
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_id(key: &str) -> Result<i64> {
    env_var(key)?.trim().parse::<i64>().map_err(|e| {
        IntelligenceError::configuration(
            ConfigurationErrorKind::InvalidProperty,
            format!("Invalid {key}: {e}"),
        )
    })
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
