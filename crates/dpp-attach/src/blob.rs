use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AttachResult;

/// Byte-storage collaborator behind the attachment index.
///
/// Paths are opaque relative handles derived by the index; a backend maps
/// them onto whatever it addresses bytes with (filesystem paths, object
/// keys). Backends never interpret the bytes.
pub trait BlobStore: Send + Sync {
    /// Write bytes at `path`, replacing any previous content.
    fn store(&self, path: &str, bytes: &[u8]) -> AttachResult<()>;

    /// Read the bytes at `path`.
    fn read(&self, path: &str) -> AttachResult<Vec<u8>>;

    /// Remove the bytes at `path`. Removing an absent path is an error;
    /// callers that tolerate it decide so themselves.
    fn delete(&self, path: &str) -> AttachResult<()>;

    /// Whether bytes exist at `path`.
    fn exists(&self, path: &str) -> AttachResult<bool>;

    /// Size in bytes of the content at `path`.
    fn size(&self, path: &str) -> AttachResult<u64>;
}

/// Local-directory [`BlobStore`].
///
/// All handles resolve relative to one root directory, created on
/// construction. With `reset`, any existing content under the root is
/// removed first -- the development-mode behavior.
#[derive(Debug)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>, reset: bool) -> AttachResult<Self> {
        let root = root.into();
        if reset && root.exists() {
            debug!(root = %root.display(), "found existing data, permanently deleting");
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// The root directory this store writes under.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for FilesystemBlobStore {
    fn store(&self, path: &str, bytes: &[u8]) -> AttachResult<()> {
        let full = self.resolve(path);
        if let Some(dir) = full.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&full, bytes)?;
        Ok(())
    }

    fn read(&self, path: &str) -> AttachResult<Vec<u8>> {
        Ok(fs::read(self.resolve(path))?)
    }

    fn delete(&self, path: &str) -> AttachResult<()> {
        fs::remove_file(self.resolve(path))?;
        Ok(())
    }

    fn exists(&self, path: &str) -> AttachResult<bool> {
        Ok(self.resolve(path).is_file())
    }

    fn size(&self, path: &str) -> AttachResult<u64> {
        Ok(fs::metadata(self.resolve(path))?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FilesystemBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path().join("attachments"), false).unwrap();
        (dir, store)
    }

    #[test]
    fn store_and_read_roundtrip() {
        let (_dir, store) = store();
        store.store("dpps/dpp-1/manual.pdf", b"pdf bytes").unwrap();
        assert_eq!(store.read("dpps/dpp-1/manual.pdf").unwrap(), b"pdf bytes");
        assert_eq!(store.size("dpps/dpp-1/manual.pdf").unwrap(), 9);
    }

    #[test]
    fn store_creates_intermediate_directories() {
        let (_dir, store) = store();
        store
            .store("templates/tpl-1/vLatest/schema.json", b"{}")
            .unwrap();
        assert!(store.exists("templates/tpl-1/vLatest/schema.json").unwrap());
    }

    #[test]
    fn store_replaces_content() {
        let (_dir, store) = store();
        store.store("a/b", b"one").unwrap();
        store.store("a/b", b"two").unwrap();
        assert_eq!(store.read("a/b").unwrap(), b"two");
    }

    #[test]
    fn delete_removes_bytes() {
        let (_dir, store) = store();
        store.store("a/b", b"bytes").unwrap();
        store.delete("a/b").unwrap();
        assert!(!store.exists("a/b").unwrap());
        // Second delete surfaces the I/O error.
        assert!(store.delete("a/b").is_err());
    }

    #[test]
    fn reset_clears_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("attachments");
        let store = FilesystemBlobStore::new(&root, false).unwrap();
        store.store("a/b", b"old").unwrap();

        let store = FilesystemBlobStore::new(&root, true).unwrap();
        assert!(!store.exists("a/b").unwrap());
    }
}
