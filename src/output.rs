//! Publishing of finished output files.

use std::{fs, path::Path};

use tempfile::{NamedTempFile, PersistError};

/// Renames a fully written staging file to `target` and makes it world-readable.
///
/// Temporary files are created owner-only; published files should not be.
pub(crate) fn publish(staging: NamedTempFile, target: &Path) -> Result<fs::File, PersistError> {
    let file = staging.persist(target)?;
    relax_permissions(&file);
    Ok(file)
}

#[cfg(unix)]
fn relax_permissions(file: &fs::File) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o644)) {
        tracing::warn!("could not set output permissions: {err}");
    }
}

#[cfg(not(unix))]
fn relax_permissions(_file: &fs::File) {}
