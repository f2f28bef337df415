use crate::error::StoreResult;

/// Lazily produced scan over `(key, value)` pairs in ascending key order.
///
/// The iterator borrows the store; it is not restartable once partially
/// consumed.
pub type ScanIter<'a> = Box<dyn Iterator<Item = StoreResult<(Vec<u8>, Vec<u8>)>> + Send + 'a>;

/// An embedded, sorted key-value engine.
///
/// All implementations must satisfy these invariants:
/// - Keys are totally ordered lexicographically over raw bytes.
/// - Each individual call is atomic with respect to concurrent callers;
///   nothing stronger is promised across calls or across keys.
/// - `get` on a missing key is `Ok(None)`, never an error.
/// - `delete` on a missing key succeeds (idempotent).
pub trait OrderedStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Upsert `value` under `key`. Last write wins.
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Remove `key`. Succeeds whether or not the key existed.
    fn delete(&self, key: &[u8]) -> StoreResult<()>;

    /// Iterate ascending from `start`.
    ///
    /// With `end = Some(e)` the scan covers `[start, e)`. With `end = None`
    /// it is a prefix scan: iteration stops at the first key that does not
    /// start with `start` as a byte prefix (not merely one that is
    /// `>= start`).
    fn scan<'a>(&'a self, start: &[u8], end: Option<&[u8]>) -> ScanIter<'a>;

    /// Delete every key a `scan(start, end)` would yield, returning how
    /// many were deleted.
    ///
    /// Two-phase: the full match list is materialized first, then deleted,
    /// so the delete never reads store state it has itself mutated
    /// mid-scan. The two phases are NOT atomic with respect to concurrent
    /// writers; a key inserted into the range between the phases survives.
    /// Callers must treat overlapping range-delete and range-write as racy.
    fn delete_range(&self, start: &[u8], end: Option<&[u8]>) -> StoreResult<usize> {
        let keys = self
            .scan(start, end)
            .map(|entry| entry.map(|(key, _)| key))
            .collect::<StoreResult<Vec<_>>>()?;
        for key in &keys {
            self.delete(key)?;
        }
        Ok(keys.len())
    }
}

impl<T: OrderedStore + ?Sized> OrderedStore for &T {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn scan<'a>(&'a self, start: &[u8], end: Option<&[u8]>) -> ScanIter<'a> {
        (**self).scan(start, end)
    }

    fn delete_range(&self, start: &[u8], end: Option<&[u8]>) -> StoreResult<usize> {
        (**self).delete_range(start, end)
    }
}

impl<T: OrderedStore + ?Sized> OrderedStore for std::sync::Arc<T> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn scan<'a>(&'a self, start: &[u8], end: Option<&[u8]>) -> ScanIter<'a> {
        (**self).scan(start, end)
    }

    fn delete_range(&self, start: &[u8], end: Option<&[u8]>) -> StoreResult<usize> {
        (**self).delete_range(start, end)
    }
}
