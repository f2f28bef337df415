use crate::error::{RegistryError, RegistryResult};
use crate::keys::{PATCH_TEMPLATE, SNAPSHOT_TEMPLATE};

/// One produced dataset snapshot: its version (a unix timestamp assigned
/// at ingestion) and where its file lives. Written once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub version: i64,
    pub path: String,
}

impl SnapshotRecord {
    /// Registry key for this record.
    pub fn key(version: i64) -> String {
        SNAPSHOT_TEMPLATE.format(&[&version.to_string()])
    }

    /// Parse a `(key, value)` pair scanned from the registry.
    pub fn parse(key: &str, value: &str) -> RegistryResult<Self> {
        let version = key
            .strip_prefix("t:")
            .ok_or_else(|| corrupt(key, "missing snapshot prefix"))?
            .parse::<i64>()
            .map_err(|_| corrupt(key, "version is not an integer"))?;
        Ok(Self {
            version,
            path: value.to_string(),
        })
    }
}

/// One generated patch artifact: the version pair it transforms between
/// and where the artifact lives. Invalidated en masse whenever a new
/// snapshot triggers regeneration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchRecord {
    pub from: i64,
    pub to: i64,
    pub path: String,
}

impl PatchRecord {
    /// Registry key for this record.
    pub fn key(from: i64, to: i64) -> String {
        PATCH_TEMPLATE.format(&[&from.to_string(), &to.to_string()])
    }

    /// Parse a `(key, value)` pair scanned from the registry.
    pub fn parse(key: &str, value: &str) -> RegistryResult<Self> {
        let pair = key
            .strip_prefix("p:")
            .ok_or_else(|| corrupt(key, "missing patch prefix"))?;
        let (from, to) = pair
            .split_once('_')
            .ok_or_else(|| corrupt(key, "missing version separator"))?;
        let from = from
            .parse::<i64>()
            .map_err(|_| corrupt(key, "from-version is not an integer"))?;
        let to = to
            .parse::<i64>()
            .map_err(|_| corrupt(key, "to-version is not an integer"))?;
        Ok(Self {
            from,
            to,
            path: value.to_string(),
        })
    }
}

fn corrupt(key: &str, reason: &str) -> RegistryError {
    RegistryError::Corrupt {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
