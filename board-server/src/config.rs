//! Service configuration.
//!
//! Loaded from a JSON file: the listen address, the endpoint profile, the
//! refresh cadence, and one fetcher configuration per station.

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::fetcher::FetcherConfig;
use crate::hafas::Profile;

/// Refresh floor, to stay clear of upstream rate limits.
pub const MIN_UPDATE_SECS: u64 = 30;

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Address the HTTP surface binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Which endpoint family to query.
    #[serde(default = "default_profile")]
    pub hafas_profile: Profile,

    /// How often each board refreshes, in seconds.
    #[serde(default = "default_updates_every")]
    pub updates_every: u64,

    /// One entry per station board.
    pub stations: Vec<FetcherConfig>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_profile() -> Profile {
    Profile::Db
}

fn default_updates_every() -> u64 {
    120
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid configuration JSON
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    /// Nothing to display
    #[error("config contains no stations")]
    NoStations,
}

impl AppConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&raw)?;

        if config.stations.is_empty() {
            return Err(ConfigError::NoStations);
        }

        Ok(config)
    }

    /// Clamp values into acceptable ranges, including every station entry.
    pub fn sanitize(&mut self) {
        if self.updates_every < MIN_UPDATE_SECS {
            self.updates_every = MIN_UPDATE_SECS;
        }

        for station in &mut self.stations {
            station.sanitize();
        }
    }
}
