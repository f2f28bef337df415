//! Thin wrapper over the `bsdiff` crate: byte-level diff and apply, plus
//! file-path conveniences for working on snapshot artifacts.

use std::fs;
use std::path::Path;

use crate::error::{PatchError, PatchResult};

/// Filename suffix for patch artifacts: `{from}_to_{to}_patch.bsdiff`.
pub const PATCH_FILE_SUFFIX: &str = "_patch.bsdiff";

/// Compute a binary patch transforming `old` into `new`.
pub fn diff(old: &[u8], new: &[u8]) -> PatchResult<Vec<u8>> {
    let mut patch = Vec::new();
    bsdiff::diff(old, new, &mut patch).map_err(PatchError::Diff)?;
    Ok(patch)
}

/// Apply a patch produced by [`diff`] to `old`, reconstructing `new`.
pub fn apply(old: &[u8], patch: &[u8]) -> PatchResult<Vec<u8>> {
    let mut new = Vec::new();
    bsdiff::patch(old, &mut &patch[..], &mut new).map_err(PatchError::Apply)?;
    Ok(new)
}

/// Diff two files on disk and write the patch to `patch_path`.
pub fn file_diff(old_path: &Path, new_path: &Path, patch_path: &Path) -> PatchResult<()> {
    let old = fs::read(old_path)?;
    let new = fs::read(new_path)?;
    let patch = diff(&old, &new)?;
    fs::write(patch_path, patch)?;
    Ok(())
}

/// Apply the patch at `patch_path` to the file at `old_path`, returning the
/// reconstructed bytes.
pub fn file_apply(old_path: &Path, patch_path: &Path) -> PatchResult<Vec<u8>> {
    let old = fs::read(old_path)?;
    let patch = fs::read(patch_path)?;
    apply(&old, &patch)
}

/// Artifact filename for the `(from, to)` version pair.
pub fn artifact_name(from: i64, to: i64) -> String {
    format!("{from}_to_{to}{PATCH_FILE_SUFFIX}")
}
