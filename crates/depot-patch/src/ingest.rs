use std::path::{Path, PathBuf};

use depot_registry::Registry;
use depot_store::OrderedStore;

use crate::chain::{ChainReport, PatchChainGenerator};
use crate::error::PatchResult;

/// What one ingestion cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestReport {
    /// The version this cycle registered.
    pub version: i64,
    /// Whether the version was new relative to the last-download marker.
    pub fresh: bool,
    /// The chain run, when one happened.
    pub chain: Option<ChainReport>,
}

/// Drives one ingestion cycle for an already-built snapshot file.
///
/// The download and table-build stages live upstream; this driver picks up
/// where they hand off: register the snapshot, advance the last-download
/// marker, and rebuild the patch chain, but only when the version is
/// actually new. Re-running with the version already marked is a no-op,
/// which is what makes a crashed cycle safe to retry wholesale.
pub struct Ingestor<'a, S: OrderedStore> {
    registry: &'a Registry<S>,
    patch_dir: PathBuf,
}

impl<'a, S: OrderedStore> Ingestor<'a, S> {
    pub fn new(registry: &'a Registry<S>, patch_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            patch_dir: patch_dir.into(),
        }
    }

    /// Register `snapshot` as version `version` and regenerate patches if
    /// the version is new.
    pub fn run(&self, snapshot: &Path, version: i64) -> PatchResult<IngestReport> {
        let previous = self.registry.last_download()?;
        let fresh = previous != Some(version);

        self.registry
            .record_snapshot(version, &snapshot.display().to_string())?;
        self.registry.set_last_download(version)?;

        let chain = if fresh {
            tracing::info!(version, ?previous, "new snapshot version, regenerating patches");
            Some(PatchChainGenerator::new(self.registry, &self.patch_dir).generate(version)?)
        } else {
            tracing::info!(version, "version unchanged, skipping patch generation");
            None
        };

        Ok(IngestReport {
            version,
            fresh,
            chain,
        })
    }
}
