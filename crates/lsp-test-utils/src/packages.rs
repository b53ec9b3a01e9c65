//! [`TestStorage`]: a temporary host layout with a `Packages/` tree (the
//! resources shipped by consuming packages) and a package storage root.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory holding `Packages/` and `Storage/` side by side.
///
/// # Example
///
/// ```rust,no_run
/// use lsp_test_utils::TestStorage;
///
/// let storage = TestStorage::new();
/// storage.write_resource("LSP-json/server/package.json", "{}");
/// assert!(storage.packages_dir().join("LSP-json/server/package.json").is_file());
/// ```
pub struct TestStorage {
    temp_dir: TempDir,
}

impl Default for TestStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStorage {
    /// Create an empty layout.
    ///
    /// # Panics
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap_or_else(|e| panic!("TestStorage: {e}"));
        for dir in ["Packages", "Storage", "Cache"] {
            fs::create_dir_all(temp_dir.path().join(dir))
                .unwrap_or_else(|e| panic!("TestStorage: failed to create {dir}: {e}"));
        }
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root of the fake package resources (`Packages/`).
    pub fn packages_dir(&self) -> PathBuf {
        self.root().join("Packages")
    }

    /// Host storage root.
    pub fn storage_dir(&self) -> PathBuf {
        self.root().join("Storage")
    }

    /// Host cache root.
    pub fn cache_dir(&self) -> PathBuf {
        self.root().join("Cache")
    }

    /// Write a resource file at `relative` under `Packages/`.
    ///
    /// # Panics
    /// Panics if the write fails.
    pub fn write_resource(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.packages_dir().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("write_resource: failed to create {}: {e}", parent.display()));
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("write_resource: failed to write {}: {e}", path.display()));
        path
    }

    /// Assert that `path` (relative to the storage root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_stored(&self, relative: &str) {
        let full_path = self.storage_dir().join(relative);
        assert!(
            full_path.exists(),
            "Expected stored file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the storage root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_not_stored(&self, relative: &str) {
        let full_path = self.storage_dir().join(relative);
        assert!(
            !full_path.exists(),
            "Expected stored file NOT to exist: {}",
            full_path.display()
        );
    }
}
