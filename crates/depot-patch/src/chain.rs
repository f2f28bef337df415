use std::fs;
use std::path::{Path, PathBuf};

use depot_registry::{Registry, RegistryError};
use depot_store::OrderedStore;

use crate::diff;
use crate::error::PatchResult;

/// What one generator run did, pair by pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// The current version every generated patch targets.
    pub current: i64,
    /// `(from, to)` pairs diffed and registered this run.
    pub generated: Vec<(i64, i64)>,
    /// `(from, to)` pairs skipped because record and artifact both survive.
    pub skipped: Vec<(i64, i64)>,
    /// Patch records wiped during invalidation.
    pub invalidated_records: usize,
    /// Artifact files unlinked during invalidation.
    pub invalidated_artifacts: usize,
}

/// Rebuilds the patch chain after a new snapshot becomes current.
///
/// Given current version `V`, ensures every other registered snapshot `O`
/// has an on-disk patch transforming it into `V`:
///
/// 1. Delete every existing patch record and every `*.bsdiff` artifact in
///    the patch directory. Invalidation is total; an old patch is valid
///    only against the exact version pair it was computed for.
/// 2. For each snapshot `O != V`, diff `O`'s bytes to `V`'s bytes, write
///    the artifact, then register the record. A pair whose record AND
///    artifact both still exist is skipped: the registry and the
///    filesystem can diverge if a previous run was interrupted, and the
///    re-check keeps the retry cheap.
///
/// Any single diff or write failure aborts the run; the caller retries the
/// whole ingestion cycle and the re-check skips the pairs that completed.
pub struct PatchChainGenerator<'a, S: OrderedStore> {
    registry: &'a Registry<S>,
    patch_dir: PathBuf,
}

impl<'a, S: OrderedStore> PatchChainGenerator<'a, S> {
    pub fn new(registry: &'a Registry<S>, patch_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            patch_dir: patch_dir.into(),
        }
    }

    /// Run invalidation and regeneration for current version `current`.
    pub fn generate(&self, current: i64) -> PatchResult<ChainReport> {
        let mut report = ChainReport {
            current,
            ..ChainReport::default()
        };

        report.invalidated_artifacts = self.unlink_artifacts()?;
        report.invalidated_records = self.registry.clear_patches()?;
        tracing::info!(
            current,
            records = report.invalidated_records,
            artifacts = report.invalidated_artifacts,
            "invalidated previous patch chain"
        );

        let current_path = self.registry.snapshot_path(current)?;
        let current_bytes = fs::read(&current_path)?;

        for snapshot in self.registry.snapshots()? {
            if snapshot.version == current {
                continue;
            }

            if let Some(existing) = self.existing_artifact(snapshot.version, current)? {
                tracing::info!(
                    from = snapshot.version,
                    to = current,
                    path = %existing.display(),
                    "patch already present, skipping"
                );
                report.skipped.push((snapshot.version, current));
                continue;
            }

            tracing::debug!(from = snapshot.version, to = current, "creating patch");
            let old_bytes = fs::read(&snapshot.path)?;
            let patch = diff::diff(&old_bytes, &current_bytes)?;

            fs::create_dir_all(&self.patch_dir)?;
            let artifact = self
                .patch_dir
                .join(diff::artifact_name(snapshot.version, current));
            fs::write(&artifact, &patch)?;

            // Record only after the artifact is durably on disk, so a
            // record never points at a write that failed.
            self.registry.record_patch(
                snapshot.version,
                current,
                &artifact.display().to_string(),
            )?;
            report.generated.push((snapshot.version, current));
        }

        tracing::info!(
            current,
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            "patch chain complete"
        );
        Ok(report)
    }

    /// The surviving artifact path for `(from, to)`, if both the record
    /// and the file it points at still exist.
    fn existing_artifact(&self, from: i64, to: i64) -> PatchResult<Option<PathBuf>> {
        match self.registry.patch_path(from, to) {
            Ok(path) => {
                let path = PathBuf::from(path);
                if path.exists() {
                    Ok(Some(path))
                } else {
                    // Record without artifact: regenerate.
                    Ok(None)
                }
            }
            Err(RegistryError::NotFound { .. }) => Ok(None),
            Err(other) => Err(other.into()),
        }
    }

    /// Unlink every patch artifact in the patch directory.
    fn unlink_artifacts(&self) -> PatchResult<usize> {
        if !self.patch_dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.patch_dir)? {
            let path = entry?.path();
            if is_patch_artifact(&path) {
                tracing::debug!(path = %path.display(), "deleting old patch artifact");
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn is_patch_artifact(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bsdiff"))
}
