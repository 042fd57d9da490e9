//! Server configuration loaded from environment variables.

use std::env;

use thiserror::Error;

/// Default TCP listen port.
pub const DEFAULT_PORT: u16 = 11211;

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `MEMD_CACHE_CAPACITY` was not set.
    #[error("MEMD_CACHE_CAPACITY must be set")]
    MissingCapacity,

    /// A variable was set to an unusable value.
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP listen port.
    pub port: u16,
    /// Maximum number of entries the cache keeps in steady state.
    pub cache_capacity: usize,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// # Environment Variables
    /// - `MEMD_PORT` - TCP listen port (default: 11211)
    /// - `MEMD_CACHE_CAPACITY` - cache capacity, required, must be > 0
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("MEMD_PORT") {
            None => DEFAULT_PORT,
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "MEMD_PORT",
                value,
            })?,
        };

        let capacity = lookup("MEMD_CACHE_CAPACITY").ok_or(ConfigError::MissingCapacity)?;
        let cache_capacity: usize = capacity.parse().map_err(|_| ConfigError::Invalid {
            name: "MEMD_CACHE_CAPACITY",
            value: capacity.clone(),
        })?;
        if cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "MEMD_CACHE_CAPACITY",
                value: capacity,
            });
        }

        Ok(Self {
            port,
            cache_capacity,
        })
    }
}
