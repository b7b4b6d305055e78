//! Service settings, read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `MONGODB_URI` | none, the in-memory store is used |
//! | `MONGODB_DATABASE` | `TripSplit` |
//! | `SERVICE_API_TOKEN` | required |
//! | `BIND_ADDRESS` | `0.0.0.0` |
//! | `PORT` | `8080` |
//! | `CORS_ALLOWED_ORIGINS` | any origin (comma separated list) |
//!
//! Log filtering is controlled by `RUST_LOG`.
use std::env;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SettingsError {
    #[error("You need to add the {0} to the env")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    pub service_token: String,
    pub bind_address: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(value) => value.trim().parse().map_err(|_| SettingsError::Invalid {
                name: "PORT",
                value,
            })?,
            None => 8080,
        };

        Ok(Settings {
            mongodb_uri: non_empty("MONGODB_URI"),
            mongodb_database: non_empty("MONGODB_DATABASE").unwrap_or_else(|| "TripSplit".into()),
            service_token: non_empty("SERVICE_API_TOKEN")
                .ok_or(SettingsError::Missing("SERVICE_API_TOKEN"))?,
            bind_address: non_empty("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            allowed_origins: non_empty("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}
