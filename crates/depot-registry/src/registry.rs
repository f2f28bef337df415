use depot_store::OrderedStore;

use crate::error::{RegistryError, RegistryResult};
use crate::keys::{KeyTemplate, LAST_DOWNLOAD_KEY, PATCH_TEMPLATE, SNAPSHOT_TEMPLATE};
use crate::records::{PatchRecord, SnapshotRecord};

/// Prefix-keyed accessor over the ordered store for snapshot and patch
/// records.
///
/// The registry does not own a storage instance of its own; it is a view
/// over whichever store handle the caller holds (the broker's live handle,
/// or an offline tool's own handle while the broker is stopped).
pub struct Registry<S: OrderedStore> {
    store: S,
}

impl<S: OrderedStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // -- template-level operations ------------------------------------------

    /// Set `value` under the key built from `template` and `args`.
    pub fn set_with_prefix(
        &self,
        template: KeyTemplate,
        args: &[&str],
        value: &str,
    ) -> RegistryResult<()> {
        let key = template.format(args);
        tracing::debug!(key, value, "registry set");
        self.store.put(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    /// Read the value under the key built from `template` and `args`.
    pub fn get_with_prefix(&self, template: KeyTemplate, args: &[&str]) -> RegistryResult<String> {
        let key = template.format(args);
        match self.store.get(key.as_bytes())? {
            Some(value) => decode_utf8(&key, value),
            None => Err(RegistryError::NotFound { key }),
        }
    }

    /// Iterate every `(key, value)` whose key starts with the prefix built
    /// from `template` and `args`, in ascending key order.
    ///
    /// Lazily produced; not restartable once partially consumed.
    pub fn scan_with_prefix<'a>(
        &'a self,
        template: KeyTemplate,
        args: &[&str],
    ) -> impl Iterator<Item = RegistryResult<(String, String)>> + 'a {
        let prefix = template.prefix(args);
        self.store
            .scan(prefix.as_bytes(), None)
            .map(|entry| {
                let (key, value) = entry?;
                let key = String::from_utf8(key)
                    .map_err(|_| RegistryError::Corrupt {
                        key: String::from("<non-utf8>"),
                        reason: "key is not UTF-8".into(),
                    })?;
                let value = decode_utf8(&key, value)?;
                Ok((key, value))
            })
    }

    /// Delete every key under the prefix built from `template` and `args`.
    /// Materialize-then-delete, like `DELETE_RANGE` on the wire.
    pub fn delete_all_with_prefix(
        &self,
        template: KeyTemplate,
        args: &[&str],
    ) -> RegistryResult<usize> {
        let prefix = template.prefix(args);
        let deleted = self.store.delete_range(prefix.as_bytes(), None)?;
        tracing::debug!(prefix, deleted, "registry prefix delete");
        Ok(deleted)
    }

    // -- snapshot records ---------------------------------------------------

    /// Record a produced snapshot. At most one record exists per version;
    /// re-recording a version overwrites it with the same natural key.
    pub fn record_snapshot(&self, version: i64, path: &str) -> RegistryResult<()> {
        self.set_with_prefix(SNAPSHOT_TEMPLATE, &[&version.to_string()], path)
    }

    /// Path of the snapshot registered under `version`.
    pub fn snapshot_path(&self, version: i64) -> RegistryResult<String> {
        self.get_with_prefix(SNAPSHOT_TEMPLATE, &[&version.to_string()])
    }

    /// Every registered snapshot, ascending by version.
    pub fn snapshots(&self) -> RegistryResult<Vec<SnapshotRecord>> {
        let mut records = self
            .scan_with_prefix(SNAPSHOT_TEMPLATE, &[])
            .map(|entry| {
                let (key, value) = entry?;
                SnapshotRecord::parse(&key, &value)
            })
            .collect::<RegistryResult<Vec<_>>>()?;
        records.sort_by_key(|r| r.version);
        Ok(records)
    }

    // -- patch records ------------------------------------------------------

    /// Record a generated patch artifact for the `(from, to)` pair.
    pub fn record_patch(&self, from: i64, to: i64, path: &str) -> RegistryResult<()> {
        self.set_with_prefix(
            PATCH_TEMPLATE,
            &[&from.to_string(), &to.to_string()],
            path,
        )
    }

    /// Path of the patch artifact for `(from, to)`.
    pub fn patch_path(&self, from: i64, to: i64) -> RegistryResult<String> {
        self.get_with_prefix(PATCH_TEMPLATE, &[&from.to_string(), &to.to_string()])
    }

    /// Every registered patch, in key order.
    pub fn patches(&self) -> RegistryResult<Vec<PatchRecord>> {
        self.scan_with_prefix(PATCH_TEMPLATE, &[])
            .map(|entry| {
                let (key, value) = entry?;
                PatchRecord::parse(&key, &value)
            })
            .collect()
    }

    /// Drop every patch record. Returns how many were deleted.
    pub fn clear_patches(&self) -> RegistryResult<usize> {
        self.delete_all_with_prefix(PATCH_TEMPLATE, &[])
    }

    // -- last-download marker -----------------------------------------------

    /// Version of the most recently ingested snapshot, if any cycle has
    /// completed yet.
    pub fn last_download(&self) -> RegistryResult<Option<i64>> {
        match self.store.get(LAST_DOWNLOAD_KEY.as_bytes())? {
            None => Ok(None),
            Some(raw) => {
                let text = decode_utf8(LAST_DOWNLOAD_KEY, raw)?;
                let version = text.parse::<i64>().map_err(|_| RegistryError::Corrupt {
                    key: LAST_DOWNLOAD_KEY.into(),
                    reason: "marker is not an integer".into(),
                })?;
                Ok(Some(version))
            }
        }
    }

    /// Record `version` as the most recently ingested snapshot. Written
    /// once per successful ingestion cycle.
    pub fn set_last_download(&self, version: i64) -> RegistryResult<()> {
        self.store
            .put(LAST_DOWNLOAD_KEY.as_bytes(), version.to_string().as_bytes())?;
        Ok(())
    }
}

fn decode_utf8(key: &str, value: Vec<u8>) -> RegistryResult<String> {
    String::from_utf8(value).map_err(|_| RegistryError::Corrupt {
        key: key.to_string(),
        reason: "value is not UTF-8".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_store::SledStore;

    fn registry() -> Registry<SledStore> {
        Registry::new(SledStore::temporary().unwrap())
    }

    #[test]
    fn set_and_get_with_prefix() {
        let reg = registry();
        reg.set_with_prefix(SNAPSHOT_TEMPLATE, &["123"], "/dbs/123.sqlite3")
            .unwrap();
        let got = reg.get_with_prefix(SNAPSHOT_TEMPLATE, &["123"]).unwrap();
        assert_eq!(got, "/dbs/123.sqlite3");
    }

    #[test]
    fn get_missing_is_not_found() {
        let reg = registry();
        let err = reg.get_with_prefix(SNAPSHOT_TEMPLATE, &["999"]).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { key } if key == "t:999"));
    }

    #[test]
    fn scan_stays_inside_namespace() {
        let reg = registry();
        reg.record_snapshot(1, "/dbs/1").unwrap();
        reg.record_snapshot(2, "/dbs/2").unwrap();
        reg.record_patch(1, 2, "/patches/1_to_2").unwrap();
        reg.set_last_download(2).unwrap();

        let snaps: Vec<_> = reg
            .scan_with_prefix(SNAPSHOT_TEMPLATE, &[])
            .collect::<RegistryResult<Vec<_>>>()
            .unwrap();
        assert_eq!(snaps.len(), 2);
        assert!(snaps.iter().all(|(k, _)| k.starts_with("t:")));
    }

    #[test]
    fn snapshots_sorted_by_version() {
        let reg = registry();
        reg.record_snapshot(1408657614, "/dbs/c").unwrap();
        reg.record_snapshot(1408657604, "/dbs/a").unwrap();
        reg.record_snapshot(1408657609, "/dbs/b").unwrap();

        let versions: Vec<i64> = reg.snapshots().unwrap().iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![1408657604, 1408657609, 1408657614]);
    }

    #[test]
    fn one_record_per_version() {
        let reg = registry();
        reg.record_snapshot(100, "/dbs/first").unwrap();
        reg.record_snapshot(100, "/dbs/second").unwrap();
        let snaps = reg.snapshots().unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].path, "/dbs/second");
    }

    #[test]
    fn clear_patches_leaves_snapshots() {
        let reg = registry();
        reg.record_snapshot(1, "/dbs/1").unwrap();
        reg.record_patch(1, 2, "/patches/a").unwrap();
        reg.record_patch(2, 3, "/patches/b").unwrap();

        assert_eq!(reg.clear_patches().unwrap(), 2);
        assert!(reg.patches().unwrap().is_empty());
        assert_eq!(reg.snapshots().unwrap().len(), 1);
    }

    #[test]
    fn patch_lookup_round_trip() {
        let reg = registry();
        reg.record_patch(100, 200, "/patches/100_to_200_patch.bsdiff")
            .unwrap();
        assert_eq!(
            reg.patch_path(100, 200).unwrap(),
            "/patches/100_to_200_patch.bsdiff"
        );
        assert!(matches!(
            reg.patch_path(100, 300),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn last_download_marker_lifecycle() {
        let reg = registry();
        assert_eq!(reg.last_download().unwrap(), None);
        reg.set_last_download(1408657604).unwrap();
        assert_eq!(reg.last_download().unwrap(), Some(1408657604));
        reg.set_last_download(1408657609).unwrap();
        assert_eq!(reg.last_download().unwrap(), Some(1408657609));
    }

    #[test]
    fn registry_over_a_shared_store_handle() {
        // The offline tools build their registry view over the same handle
        // other components hold.
        let store = std::sync::Arc::new(SledStore::temporary().unwrap());
        let reg = Registry::new(std::sync::Arc::clone(&store));
        reg.record_snapshot(100, "/dbs/100").unwrap();

        assert_eq!(store.get(b"t:100").unwrap(), Some(b"/dbs/100".to_vec()));
        assert_eq!(reg.snapshots().unwrap().len(), 1);
    }

    #[test]
    fn malformed_persisted_key_surfaces_as_corrupt() {
        let store = SledStore::temporary().unwrap();
        store.put(b"t:not-a-version", b"/dbs/x").unwrap();
        let reg = Registry::new(store);
        assert!(matches!(
            reg.snapshots(),
            Err(RegistryError::Corrupt { .. })
        ));
    }
}
