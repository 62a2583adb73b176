//! Committee configuration, loaded from a JSON file with environment-variable overrides for the
//! deployment-specific keys. Out-of-range values refuse to start.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;
use validator::Validate;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {error}")]
    Io { path: PathBuf, error: std::io::Error },
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),
    #[error("Invalid value in environment variable {key}: {reason}")]
    InvalidOverride { key: &'static str, reason: String },
}

/// The backing store of the committee's facts and progress records. Heavier backends plug in
/// behind the `Storage` trait; the core ships the in-memory one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "class")]
pub enum StorageConfig {
    #[default]
    InMemory,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CommitteeConfig {
    /// Height of the vault Merkle tree.
    #[validate(range(max = 63))]
    pub vaults_merkle_height: usize,
    /// Height of the order Merkle tree.
    #[validate(range(max = 63))]
    pub orders_merkle_height: usize,
    /// Sleep, in seconds, between retries and empty polls.
    #[serde(
        deserialize_with = "deserialize_seconds_to_duration",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub polling_interval: Duration,
    /// Whether to recompute the order root in addition to the vault root.
    #[serde(default)]
    pub validate_orders: bool,
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,
    pub availability_gw_endpoint: Url,
    /// Directory with `user.crt`, `user.key` and `server.crt` for mutual TLS towards the
    /// gateway.
    #[serde(default)]
    pub certificates_path: Option<PathBuf>,
    /// Size of the Pedersen hash worker pool.
    #[serde(default = "default_hash_workers")]
    #[validate(range(min = 1))]
    pub hash_workers: usize,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from("/private_key.txt")
}

fn default_hash_workers() -> usize {
    std::thread::available_parallelism().map(usize::from).unwrap_or(1)
}

fn deserialize_seconds_to_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Duration, D::Error> {
    let seconds: u64 = Deserialize::deserialize(deserializer)?;
    Ok(Duration::from_secs(seconds))
}

fn serialize_duration_to_seconds<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

impl CommitteeConfig {
    /// Loads the configuration file, applies the environment overrides, and validates the
    /// result. Heights above the supported maximum of 63 are rejected here, before any tree is
    /// touched.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|error| ConfigError::Io { path: path.to_owned(), error })?;
        let mut config: CommitteeConfig = serde_json::from_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = std::env::var("AVAILABILITY_GW_ENDPOINT") {
            self.availability_gw_endpoint =
                endpoint.parse().map_err(|error: url::ParseError| ConfigError::InvalidOverride {
                    key: "AVAILABILITY_GW_ENDPOINT",
                    reason: error.to_string(),
                })?;
        }
        if let Ok(path) = std::env::var("PRIVATE_KEY_PATH") {
            self.private_key_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("CERTIFICATES_PATH") {
            self.certificates_path = Some(PathBuf::from(path));
        }
        if let Ok(workers) = std::env::var("HASH_WORKERS") {
            self.hash_workers =
                workers.parse().map_err(|error: std::num::ParseIntError| {
                    ConfigError::InvalidOverride { key: "HASH_WORKERS", reason: error.to_string() }
                })?;
        }
        Ok(())
    }

    /// Reads the private key from the configured file, dropping the trailing newline.
    pub fn load_private_key(&self) -> Result<String, ConfigError> {
        let contents = std::fs::read_to_string(&self.private_key_path)
            .map_err(|error| ConfigError::Io { path: self.private_key_path.clone(), error })?;
        Ok(contents.trim_end().to_owned())
    }
}
