//! World-writable storage directories.

use std::fs;

use camino::Utf8Path;

use crate::errors::InstallError;

/// Creates each directory if needed and adds the world-writable bit to it
/// and everything below it.
///
/// # Errors
///
/// Returns [`InstallError::Permissions`] for the first path that cannot be
/// created or changed.
pub fn grant_world_write<P: AsRef<Utf8Path>>(dirs: &[P]) -> Result<(), InstallError> {
    for dir in dirs {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| InstallError::Permissions {
            path: dir.to_owned(),
            source,
        })?;
        apply(dir)?;
    }
    Ok(())
}

fn apply(path: &Utf8Path) -> Result<(), InstallError> {
    let error = |source| InstallError::Permissions {
        path: path.to_owned(),
        source,
    };
    let metadata = fs::symlink_metadata(path).map_err(error)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }
    add_other_write(path, &metadata).map_err(error)?;
    if metadata.is_dir() {
        for entry in path.read_dir_utf8().map_err(error)? {
            apply(entry.map_err(error)?.path())?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn add_other_write(path: &Utf8Path, metadata: &fs::Metadata) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o002);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn add_other_write(_path: &Utf8Path, _metadata: &fs::Metadata) -> std::io::Result<()> {
    Ok(())
}
