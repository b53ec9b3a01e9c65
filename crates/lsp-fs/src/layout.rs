//! Package storage layout
//!
//! ```text
//! <storage>/<package_name>/                     server payload + markers
//! <storage>/lsp_utils/node-runtime/<version>/   local Node.js runtimes
//! <storage>/lsp_utils/uv/                       self-managed uv
//! ```

use std::path::{Path, PathBuf};

use crate::StoragePath;

/// Resolves paths inside the host-provided storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: dunce::simplified(root.as_ref()).to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Payload directory owned by a single package.
    pub fn package_storage(&self, package_name: &str) -> PathBuf {
        self.root.join(package_name)
    }

    /// Shared directory for runtimes managed on behalf of all packages.
    pub fn lsp_utils_dir(&self) -> PathBuf {
        self.root.join(StoragePath::LspUtilsDir)
    }

    pub fn node_runtime_dir(&self) -> PathBuf {
        self.lsp_utils_dir().join(StoragePath::NodeRuntimeDir)
    }

    pub fn uv_dir(&self) -> PathBuf {
        self.lsp_utils_dir().join(StoragePath::UvDir)
    }
}
