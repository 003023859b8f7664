use std::io;
use std::path::Path;

use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

const STAGING_PREFIX: &str = ".ebook-staging-";

/// Uniquely named working copy location that is removed on every exit path.
///
/// `close` reports removal errors; dropping without closing removes the
/// directory and only logs a failure.
pub struct StagingDir {
    dir: Option<TempDir>,
}

impl StagingDir {
    pub fn create_in(parent: &Path) -> io::Result<Self> {
        let dir = Builder::new().prefix(STAGING_PREFIX).tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => unreachable!("staging directory used after close"),
        }
    }

    pub fn close(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                debug!(path = %dir.path().display(), "removing staging directory");
                dir.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            debug!(path = %path.display(), "removing staging directory");
            if let Err(err) = dir.close() {
                warn!(path = %path.display(), error = %err, "failed to remove staging directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn close_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let staging = StagingDir::create_in(parent.path()).unwrap();
        let path = staging.path().to_path_buf();
        fs::write(path.join("book.opf"), "opf").unwrap();

        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(STAGING_PREFIX));
        staging.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let staging = StagingDir::create_in(parent.path()).unwrap();
            fs::create_dir(staging.path().join("nested")).unwrap();
            staging.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique() {
        let parent = tempfile::tempdir().unwrap();
        let first = StagingDir::create_in(parent.path()).unwrap();
        let second = StagingDir::create_in(parent.path()).unwrap();
        assert_ne!(first.path(), second.path());
    }
}
