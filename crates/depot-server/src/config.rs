use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Depot-wide configuration, shared by the broker and the offline tools.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    /// Broker listen address. Localhost-only by default; the broker is a
    /// private interface, not the outward API.
    pub bind_addr: SocketAddr,
    /// Directory of the embedded store (registry + auxiliary metadata).
    pub store_path: PathBuf,
    /// Directory patch artifacts are written into.
    pub patch_dir: PathBuf,
    /// Seconds a connection may sit idle before the broker closes it.
    /// Zero disables the timeout.
    pub idle_timeout_secs: u64,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], depot_proto::DEFAULT_PORT)),
            store_path: PathBuf::from("configdb"),
            patch_dir: PathBuf::from("db_patches"),
            idle_timeout_secs: 300,
        }
    }
}

impl DepotConfig {
    /// Load configuration from a TOML file. Missing keys fall back to the
    /// defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// The idle timeout as a duration, `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
