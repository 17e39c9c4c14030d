//! Atomic, digest-compared file writes.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{ConfigurationFileError, ConfigurationFileResult};

/// Mode applied to files carrying credentials or key material.
pub(crate) const PRIVATE_MODE: u32 = 0o600;
/// Mode applied to systemd unit files.
pub(crate) const PUBLIC_MODE: u32 = 0o644;

/// Create `dir` and its parents when missing.
pub(crate) fn ensure_dir(dir: &Path) -> ConfigurationFileResult<()> {
    fs::create_dir_all(dir).map_err(|err| ConfigurationFileError::io("create_dir", dir, err))
}

/// Contents of `path`, or `None` when it does not exist.
pub(crate) fn read_if_exists(path: &Path) -> ConfigurationFileResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(existing) => Ok(Some(existing)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ConfigurationFileError::io("read", path, err)),
    }
}

fn digest_of(path: &Path) -> ConfigurationFileResult<Option<Vec<u8>>> {
    Ok(read_if_exists(path)?.map(|existing| Sha256::digest(&existing).to_vec()))
}

/// Combined SHA-256 over `paths` in order; a missing file hashes differently from an empty one.
pub(crate) fn digest_files(paths: &[PathBuf]) -> ConfigurationFileResult<Vec<u8>> {
    let mut hasher = Sha256::new();
    for path in paths {
        match digest_of(path)? {
            Some(digest) => {
                hasher.update([1_u8]);
                hasher.update(digest);
            }
            None => hasher.update([0_u8]),
        }
    }
    Ok(hasher.finalize().to_vec())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` unless the file already holds identical bytes.
///
/// Returns whether the file was written. The new contents land in a sibling
/// staging file first and are renamed over the target.
pub(crate) fn write_if_changed(
    path: &Path,
    contents: &[u8],
    mode: u32,
) -> ConfigurationFileResult<bool> {
    if digest_of(path)?.as_deref() == Some(Sha256::digest(contents).as_slice()) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let staging = staging_path(path);
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(mode);
    let mut file = options
        .open(&staging)
        .map_err(|err| ConfigurationFileError::io("open_staging", &staging, err))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|err| ConfigurationFileError::io("write_staging", &staging, err))?;
    drop(file);
    set_mode(&staging, mode)?;
    fs::rename(&staging, path).map_err(|err| ConfigurationFileError::io("rename", path, err))?;

    info!(path = %path.display(), "wrote file");
    Ok(true)
}

/// Restrict `path` to `mode`.
pub(crate) fn set_mode(path: &Path, mode: u32) -> ConfigurationFileResult<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|err| ConfigurationFileError::io("set_permissions", path, err))
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use tempfile::TempDir;

    #[test]
    fn write_if_changed_skips_identical_contents() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let path = temp.path().join("nested").join("config.yaml");

        assert!(write_if_changed(&path, b"a: 1\n", PRIVATE_MODE)?);
        assert!(!write_if_changed(&path, b"a: 1\n", PRIVATE_MODE)?);
        assert!(write_if_changed(&path, b"a: 2\n", PRIVATE_MODE)?);
        assert_eq!(fs::read_to_string(&path)?, "a: 2\n");
        assert!(!staging_path(&path).exists());
        Ok(())
    }

    #[test]
    fn digest_tracks_contents_and_presence() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let files = [temp.path().join("config.yaml"), temp.path().join("registration.yaml")];

        let missing = digest_files(&files)?;
        fs::write(&files[0], b"")?;
        let empty = digest_files(&files)?;
        assert_ne!(missing, empty);

        fs::write(&files[0], b"a: 1\n")?;
        let first = digest_files(&files)?;
        assert_eq!(digest_files(&files)?, first);
        fs::write(&files[1], b"id: irc\n")?;
        assert_ne!(digest_files(&files)?, first);
        assert!(read_if_exists(&temp.path().join("absent"))?.is_none());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn written_files_carry_the_requested_mode() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let path = temp.path().join("signing.jwk");
        write_if_changed(&path, b"{}", PRIVATE_MODE)?;
        let mode = fs::metadata(&path)?.permissions().mode() & 0o777;
        assert_eq!(mode, PRIVATE_MODE);
        Ok(())
    }
}
