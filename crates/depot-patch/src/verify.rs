use std::fs;
use std::path::Path;

use depot_registry::{Registry, RegistryError};
use depot_store::OrderedStore;

use crate::diff;
use crate::error::{PatchError, PatchResult};

/// Per-version result of a verification sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionOutcome {
    /// Patch applied and the result hashed identically to the current
    /// snapshot.
    Verified,
    /// No patch record registered for this version pair.
    MissingPatchRecord,
    /// A record exists but the artifact file is gone.
    MissingPatchArtifact { path: String },
    /// The source snapshot file itself is gone.
    MissingSnapshotFile { path: String },
    /// The patch would not apply to its source snapshot.
    ApplyFailed { reason: String },
    /// The patched bytes hash differently from the current snapshot.
    HashMismatch { expected: String, actual: String },
}

/// One verified (or failed) version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionResult {
    pub version: i64,
    pub outcome: VersionOutcome,
}

/// The full sweep: every retained version checked against the current one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationReport {
    pub current: i64,
    /// Hex blake3 digest of the current snapshot's bytes.
    pub current_digest: String,
    pub results: Vec<VersionResult>,
}

impl VerificationReport {
    /// `true` when every retained version verified.
    pub fn all_verified(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.outcome == VersionOutcome::Verified)
    }

    /// The versions that failed, with their outcomes.
    pub fn failures(&self) -> Vec<&VersionResult> {
        self.results
            .iter()
            .filter(|r| r.outcome != VersionOutcome::Verified)
            .collect()
    }
}

/// Replays every retained patch against its source snapshot and checks the
/// result is byte-identical to the current snapshot.
///
/// Hash equality is the single correctness oracle. A missing record or
/// missing file is reported for that version and the sweep continues; this
/// is a diagnostic tool, never on the serving path.
pub struct PatchVerifier<'a, S: OrderedStore> {
    registry: &'a Registry<S>,
}

impl<'a, S: OrderedStore> PatchVerifier<'a, S> {
    pub fn new(registry: &'a Registry<S>) -> Self {
        Self { registry }
    }

    /// Sweep every registered snapshot against the current one.
    ///
    /// Fails outright only when there is no current version to verify
    /// against or its own bytes cannot be read; everything else is a
    /// per-version result.
    pub fn verify(&self) -> PatchResult<VerificationReport> {
        let current = self
            .registry
            .last_download()?
            .ok_or(PatchError::NoCurrentVersion)?;
        let current_path = self.registry.snapshot_path(current)?;
        let current_bytes = fs::read(&current_path)?;
        let current_digest = blake3::hash(&current_bytes).to_hex().to_string();
        tracing::info!(current, digest = %current_digest, "verifying patch chain");

        let mut results = Vec::new();
        for snapshot in self.registry.snapshots()? {
            if snapshot.version == current {
                continue;
            }
            let outcome = self.check_version(&snapshot.path, snapshot.version, current, &current_digest);
            if outcome != VersionOutcome::Verified {
                tracing::warn!(version = snapshot.version, ?outcome, "patch verification failure");
            }
            results.push(VersionResult {
                version: snapshot.version,
                outcome,
            });
        }

        Ok(VerificationReport {
            current,
            current_digest,
            results,
        })
    }

    fn check_version(
        &self,
        snapshot_path: &str,
        version: i64,
        current: i64,
        expected_digest: &str,
    ) -> VersionOutcome {
        let patch_path = match self.registry.patch_path(version, current) {
            Ok(path) => path,
            Err(RegistryError::NotFound { .. }) => return VersionOutcome::MissingPatchRecord,
            Err(other) => {
                return VersionOutcome::ApplyFailed {
                    reason: other.to_string(),
                }
            }
        };
        if !Path::new(&patch_path).exists() {
            return VersionOutcome::MissingPatchArtifact { path: patch_path };
        }
        if !Path::new(snapshot_path).exists() {
            return VersionOutcome::MissingSnapshotFile {
                path: snapshot_path.to_string(),
            };
        }

        let patched = match diff::file_apply(Path::new(snapshot_path), Path::new(&patch_path)) {
            Ok(bytes) => bytes,
            Err(e) => {
                return VersionOutcome::ApplyFailed {
                    reason: e.to_string(),
                }
            }
        };

        let actual = blake3::hash(&patched).to_hex().to_string();
        if actual == expected_digest {
            VersionOutcome::Verified
        } else {
            VersionOutcome::HashMismatch {
                expected: expected_digest.to_string(),
                actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::PatchChainGenerator;
    use depot_store::SledStore;
    use std::fs;
    use std::path::PathBuf;

    struct Fixture {
        registry: Registry<SledStore>,
        snap_dir: tempfile::TempDir,
        patch_dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: Registry::new(SledStore::temporary().unwrap()),
                snap_dir: tempfile::tempdir().unwrap(),
                patch_dir: tempfile::tempdir().unwrap(),
            }
        }

        fn add_snapshot(&self, version: i64, contents: &[u8]) -> PathBuf {
            let path = self.snap_dir.path().join(format!("{version}.sqlite3"));
            fs::write(&path, contents).unwrap();
            self.registry
                .record_snapshot(version, &path.display().to_string())
                .unwrap();
            path
        }

        fn generate(&self, current: i64) {
            PatchChainGenerator::new(&self.registry, self.patch_dir.path())
                .generate(current)
                .unwrap();
            self.registry.set_last_download(current).unwrap();
        }
    }

    #[test]
    fn clean_chain_verifies() {
        let fx = Fixture::new();
        fx.add_snapshot(100, b"schedule build A");
        fx.add_snapshot(200, b"schedule build B");
        fx.add_snapshot(300, b"schedule build C");
        fx.generate(300);

        let report = PatchVerifier::new(&fx.registry).verify().unwrap();
        assert!(report.all_verified());
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.current, 300);
    }

    #[test]
    fn missing_record_is_reported_and_sweep_continues() {
        let fx = Fixture::new();
        fx.add_snapshot(100, b"A");
        fx.add_snapshot(200, b"B");
        fx.add_snapshot(300, b"C");
        fx.generate(300);
        fx.registry.clear_patches().unwrap();
        // Regenerate only one pair so the other is missing.
        fx.registry
            .record_patch(
                200,
                300,
                &fx.patch_dir
                    .path()
                    .join(diff::artifact_name(200, 300))
                    .display()
                    .to_string(),
            )
            .unwrap();

        let report = PatchVerifier::new(&fx.registry).verify().unwrap();
        assert!(!report.all_verified());
        assert_eq!(report.results.len(), 2);
        let missing = &report.results[0];
        assert_eq!(missing.version, 100);
        assert_eq!(missing.outcome, VersionOutcome::MissingPatchRecord);
        assert_eq!(report.results[1].outcome, VersionOutcome::Verified);
    }

    #[test]
    fn missing_artifact_is_reported() {
        let fx = Fixture::new();
        fx.add_snapshot(100, b"A");
        fx.add_snapshot(200, b"B");
        fx.generate(200);
        let artifact = fx.registry.patch_path(100, 200).unwrap();
        fs::remove_file(&artifact).unwrap();

        let report = PatchVerifier::new(&fx.registry).verify().unwrap();
        assert_eq!(
            report.results[0].outcome,
            VersionOutcome::MissingPatchArtifact { path: artifact }
        );
    }

    #[test]
    fn tampered_snapshot_fails_the_hash_oracle() {
        let fx = Fixture::new();
        let old = fx.add_snapshot(100, b"original bytes of build A");
        fx.add_snapshot(200, b"original bytes of build B");
        fx.generate(200);
        // Corrupt the source snapshot after its patch was computed.
        fs::write(&old, b"tampered bytes of build A").unwrap();

        let report = PatchVerifier::new(&fx.registry).verify().unwrap();
        assert!(matches!(
            report.results[0].outcome,
            VersionOutcome::HashMismatch { .. } | VersionOutcome::ApplyFailed { .. }
        ));
        assert_eq!(report.failures().len(), 1);
    }

    #[test]
    fn no_marker_means_nothing_to_verify_against() {
        let fx = Fixture::new();
        fx.add_snapshot(100, b"A");
        assert!(matches!(
            PatchVerifier::new(&fx.registry).verify(),
            Err(PatchError::NoCurrentVersion)
        ));
    }
}
