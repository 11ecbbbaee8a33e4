//! Owner-only filesystem layout for the database.
//!
//! On Unix the data directory ends up `0700` (when we own it) and the database
//! plus any WAL/SHM sidecars end up `0600`. Elsewhere only creation happens.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use taskboard_types::{Error, Result};

const SIDECAR_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

fn fs_error<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Error + 'a {
    move |e| Error::Store(format!("failed to {action} {}: {e}", path.display()))
}

/// Create the database file and its directory, then restrict both to the owner.
pub(crate) fn prepare_db_path(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(fs_error("create directory", dir))?;
        restrict_dir(dir)?;
    }

    let mut options = OpenOptions::new();
    options.create(true).truncate(false).read(true).write(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
    options
        .open(path)
        .map_err(fs_error("create database file", path))?;

    restrict_file(path).map_err(fs_error("set database permissions on", path))?;
    for suffix in SIDECAR_SUFFIXES {
        let sidecar = sidecar_path(path, suffix);
        if sidecar.exists()
            && let Err(err) = restrict_file(&sidecar)
        {
            tracing::warn!(path = %sidecar.display(), error = %err, "Could not restrict SQLite sidecar");
        }
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let metadata = std::fs::metadata(dir).map_err(fs_error("inspect directory", dir))?;
    // SAFETY: getuid has no preconditions and cannot fail.
    let uid = unsafe { libc::getuid() };
    if metadata.uid() != uid || metadata.permissions().mode() & 0o077 == 0 {
        return Ok(());
    }
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
        .map_err(fs_error("set permissions on directory", dir))
}

#[cfg(not(unix))]
fn restrict_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn restrict_file(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_file(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
