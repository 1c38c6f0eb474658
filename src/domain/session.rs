//! Per-request scratch workspace.

use crate::error::{Result, TransferError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Exclusively owned scratch directory bounding every file of one request.
///
/// Dropping the session removes the directory recursively, so early
/// returns and panics clean up too. [`TransferSession::close`] does the same
/// but surfaces the removal error.
pub struct TransferSession {
    dir: TempDir,
}

impl TransferSession {
    /// Create a uniquely named directory under `root` (system temp dir if `None`).
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("clipferry-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(TransferError::Workspace)?;
        tracing::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn close(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_removes_contents() {
        let root = tempfile::tempdir().unwrap();
        let session = TransferSession::create(Some(root.path())).unwrap();
        let path = session.path().to_path_buf();
        std::fs::create_dir(session.file("nested")).unwrap();
        std::fs::write(session.file("nested/video.mp4"), b"data").unwrap();

        session.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let session = TransferSession::create(Some(root.path())).unwrap();
            std::fs::write(session.file("video.mp4"), b"data").unwrap();
            session.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_sessions_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = TransferSession::create(Some(root.path())).unwrap();
        let b = TransferSession::create(Some(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));
    }
}
