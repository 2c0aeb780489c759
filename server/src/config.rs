//! Server configuration module.
//!
//! Parses configuration from environment variables for the BusTrack server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 3000 | HTTP server port |
//! | `BUSTRACK_UPDATE_INTERVAL_SECS` | No | 15 | Seconds between location broadcasts |
//! | `BUSTRACK_TOKEN_KEY` | No | - | Base64-encoded 32-byte Ed25519 seed for token signing |
//!
//! When `BUSTRACK_TOKEN_KEY` is unset the server generates an ephemeral
//! signing key at startup; tokens then become invalid on restart.

use std::env;
use std::time::Duration;

use base64::prelude::*;
use ed25519_dalek::SECRET_KEY_LENGTH;
use thiserror::Error;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 3000;

/// Default broadcast period in seconds.
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 15;

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Server configuration parsed from environment variables.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Period between location broadcasts.
    pub update_interval: Duration,

    /// Ed25519 seed for the token signing key, if configured.
    pub token_seed: Option<[u8; SECRET_KEY_LENGTH]>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("update_interval", &self.update_interval)
            .field(
                "token_seed",
                &self.token_seed.map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed: a
    /// non-numeric or out-of-range port, a zero or non-numeric interval,
    /// or a token key that is not base64 for exactly 32 bytes.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bustrack_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_port()?,
            update_interval: parse_update_interval()?,
            token_seed: parse_token_seed()?,
        })
    }
}

/// Parse the PORT environment variable, defaulting if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse the broadcast period. Must be a positive integer of seconds.
fn parse_update_interval() -> Result<Duration, ConfigError> {
    let secs = match env::var("BUSTRACK_UPDATE_INTERVAL_SECS") {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidFormat {
                var: "BUSTRACK_UPDATE_INTERVAL_SECS".to_string(),
                message: format!("expected a positive integer, got '{value}'"),
            })?,
        Err(_) => DEFAULT_UPDATE_INTERVAL_SECS,
    };

    if secs == 0 {
        return Err(ConfigError::InvalidFormat {
            var: "BUSTRACK_UPDATE_INTERVAL_SECS".to_string(),
            message: "interval must be at least 1 second".to_string(),
        });
    }

    Ok(Duration::from_secs(secs))
}

/// Parse the token signing seed: base64 for exactly 32 bytes.
fn parse_token_seed() -> Result<Option<[u8; SECRET_KEY_LENGTH]>, ConfigError> {
    let encoded = match env::var("BUSTRACK_TOKEN_KEY") {
        Ok(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };

    let bytes = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|_| ConfigError::InvalidFormat {
            var: "BUSTRACK_TOKEN_KEY".to_string(),
            message: "not valid base64".to_string(),
        })?;

    let seed: [u8; SECRET_KEY_LENGTH] =
        bytes.try_into().map_err(|_| ConfigError::InvalidFormat {
            var: "BUSTRACK_TOKEN_KEY".to_string(),
            message: format!("expected {SECRET_KEY_LENGTH} bytes"),
        })?;

    Ok(Some(seed))
}
