use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::traits::{OrderedStore, ScanIter};

/// Disk-backed ordered store over a single `sled` database.
///
/// The engine holds an exclusive file lock on the database directory, so
/// opening the same path from a second process fails. This is the depot's
/// single-owner lease: the broker keeps the handle for its whole lifetime,
/// and offline tooling (patch generation, verification) opens its own
/// handle only while the broker is stopped.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) the store at `path`, taking the single-owner lease.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| match e {
            sled::Error::Io(ref io) if io.kind() == std::io::ErrorKind::WouldBlock => {
                StoreError::LeaseHeld {
                    path: path.display().to_string(),
                }
            }
            other => StoreError::Engine(other),
        })?;
        tracing::info!(path = %path.display(), "opened store");
        Ok(Self { db })
    }

    /// Open a throwaway store backed by a temporary location.
    ///
    /// Intended for tests; the files are removed when the store is dropped.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Flush dirty buffers to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Number of live keys. Linear in store size; diagnostics only.
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

fn convert(
    entry: Result<(sled::IVec, sled::IVec), sled::Error>,
) -> StoreResult<(Vec<u8>, Vec<u8>)> {
    entry
        .map(|(k, v)| (k.to_vec(), v.to_vec()))
        .map_err(StoreError::Engine)
}

impl OrderedStore for SledStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.db.remove(key)?;
        Ok(())
    }

    fn scan<'a>(&'a self, start: &[u8], end: Option<&[u8]>) -> ScanIter<'a> {
        match end {
            Some(end) => Box::new(self.db.range(start.to_vec()..end.to_vec()).map(convert)),
            // scan_prefix stops at the first key that does not carry the
            // prefix, which is exactly the depot's prefix-scan contract.
            None => Box::new(self.db.scan_prefix(start).map(convert)),
        }
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("keys", &self.db.len())
            .finish()
    }
}
