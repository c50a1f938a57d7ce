use std::env;

use thiserror::Error;

const LOCAL_SESSION_SECRET: &str = "krib-local-session-secret-change-me";
const DEFAULT_SESSION_TTL_SECS: i64 = 12 * 60 * 60;

/// PortalConfig
///
/// Holds the portal's configuration. Loaded once at startup, immutable afterwards, and
/// pulled into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct PortalConfig {
    // Runtime environment marker. Controls log format and the Secure cookie flag.
    pub env: Env,
    // Base URL of the KRIB REST API, without trailing slash.
    pub api_base_url: String,
    // HS256 secret used to sign the session cookie.
    pub session_secret: String,
    // Lifetime of the session cookie in seconds.
    pub session_ttl_secs: i64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Which field names the property form submits.
    pub property_fields: PropertyFields,
}

/// Env
///
/// Runtime context: local development or hardened production.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// PropertyFields
///
/// Deployed KRIB backends disagree on the property schema: some expect
/// `name`/`location`, older ones `title`/`address`. The portal does not guess; the
/// deployment says which one its backend speaks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PropertyFields {
    NameLocation,
    TitleAddress,
}

impl PropertyFields {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw {
            "name_location" => Ok(PropertyFields::NameLocation),
            "title_address" => Ok(PropertyFields::TitleAddress),
            other => Err(ConfigError::Invalid {
                var: "KRIB_PROPERTY_FIELDS",
                value: other.to_string(),
            }),
        }
    }

    /// (name-like key, location-like key) as sent to `/api/properties/`.
    pub fn keys(self) -> (&'static str, &'static str) {
        match self {
            PropertyFields::NameLocation => ("name", "location"),
            PropertyFields::TitleAddress => ("title", "address"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

impl Default for PortalConfig {
    /// Safe values for tests; never reads the environment.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_base_url: "http://localhost:8000".to_string(),
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            bind_addr: "0.0.0.0:3000".to_string(),
            property_fields: PropertyFields::NameLocation,
        }
    }
}

impl PortalConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production refuses to start
    /// without an explicit API URL and session secret; local falls back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = required_in_prod(env, "KRIB_API_URL", "http://localhost:8000")?;
        let session_secret = required_in_prod(env, "KRIB_SESSION_SECRET", LOCAL_SESSION_SECRET)?;

        let session_ttl_secs = match env::var("KRIB_SESSION_TTL_SECS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or(ConfigError::Invalid {
                    var: "KRIB_SESSION_TTL_SECS",
                    value: raw,
                })?,
            Err(_) => DEFAULT_SESSION_TTL_SECS,
        };

        let property_fields = match env::var("KRIB_PROPERTY_FIELDS") {
            Ok(raw) => PropertyFields::parse(&raw)?,
            Err(_) => PropertyFields::NameLocation,
        };

        Ok(Self {
            env,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            session_secret,
            session_ttl_secs,
            bind_addr: env::var("KRIB_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            property_fields,
        })
    }
}

fn required_in_prod(
    mode: Env,
    var: &'static str,
    local_default: &str,
) -> Result<String, ConfigError> {
    match (mode, env::var(var)) {
        (_, Ok(value)) if !value.is_empty() => Ok(value),
        (Env::Production, _) => Err(ConfigError::Missing(var)),
        (Env::Local, _) => Ok(local_default.to_string()),
    }
}
