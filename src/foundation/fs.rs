use std::{io::Write as _, path::Path};

use crate::foundation::error::{OgError, OgResult};

/// Directory a sibling temp file for `path` should live in.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Create `path`'s parent directory tree if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> OgResult<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir).map_err(|e| OgError::write(dir, e))
}

/// Write `bytes` to `path`.
///
/// An existing file is replaced through a temp file in the same directory and a rename, keeping
/// its permissions; readers observe either the previous contents or the new ones. A new file is
/// created directly.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> OgResult<()> {
    let permissions = match std::fs::metadata(path) {
        Ok(meta) => meta.permissions(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::write(path, bytes).map_err(|e| OgError::write(path, e))?;
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "created file");
            return Ok(());
        }
        Err(e) => return Err(OgError::write(path, e)),
    };

    let dir = parent_dir(path);
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| OgError::write(path, e))?;
    tmp.write_all(bytes).map_err(|e| OgError::write(path, e))?;
    tmp.as_file()
        .set_permissions(permissions)
        .map_err(|e| OgError::write(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| OgError::write(path, e))?;
    tmp.persist(path).map_err(|e| OgError::write(path, e.error))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_and_overwrites() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.bin");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file should be renamed into place");
    }

    #[test]
    fn ensure_parent_dir_builds_nested_tree() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("public").join("og").join("deep").join("a.png");
        ensure_parent_dir(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn write_atomic_reports_missing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nope").join("a.png");
        let err = write_atomic(&path, b"x").unwrap_err();
        assert!(matches!(err, OgError::WriteFailure { .. }));
    }
}
