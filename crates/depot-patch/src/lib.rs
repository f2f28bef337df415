//! Patch chain maintenance for the transit depot.
//!
//! A new dataset snapshot invalidates every previously generated patch:
//! an old patch is only valid against the exact `(from, previous-current)`
//! pair, never against the new current. The generator therefore wipes and
//! rebuilds the whole chain (one binary diff from every retained snapshot
//! to the current one), and the verifier replays each stored patch against
//! its source snapshot and checks the result hashes identically to the
//! current snapshot.
//!
//! The generator and the ingest driver run offline with their own store
//! handle; they are never concurrent with the serving broker.

pub mod chain;
pub mod diff;
pub mod error;
pub mod ingest;
pub mod verify;

pub use chain::{ChainReport, PatchChainGenerator};
pub use diff::{apply, artifact_name, diff, file_apply, file_diff, PATCH_FILE_SUFFIX};
pub use error::{PatchError, PatchResult};
pub use ingest::{IngestReport, Ingestor};
pub use verify::{PatchVerifier, VerificationReport, VersionOutcome, VersionResult};
