//! Version registry for the transit depot.
//!
//! A namespaced view over the ordered store recording, for each dataset
//! snapshot, its version (a unix timestamp), its on-disk path, and the
//! patch artifacts generated between version pairs. The registry and the
//! live store are the same storage instance; registry operations inherit
//! the store's per-key atomicity and nothing more.
//!
//! Key layout (UTF-8 strings stored as raw bytes):
//!
//! - `last_download_time` -- version of the most recently ingested snapshot
//! - `t:<version>` -- snapshot record, value is the snapshot path
//! - `p:<from>_<to>` -- patch record, value is the patch artifact path

pub mod error;
pub mod keys;
pub mod records;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use keys::{KeyTemplate, LAST_DOWNLOAD_KEY, PATCH_TEMPLATE, SNAPSHOT_TEMPLATE};
pub use records::{PatchRecord, SnapshotRecord};
pub use registry::Registry;
