//! Well-known file and directory names inside package storage.

use std::path::Path;

/// Standard package storage markers and paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePath {
    /// Installation-in-progress sentinel (`.installing`)
    InstallingMarker,
    /// Node.js version the payload was installed with (`.node-version`)
    NodeVersionMarker,
    /// Interpreter version a venv was created with (`python_version`)
    PythonVersionMarker,
    /// Shared directory for runtimes managed on behalf of all packages
    LspUtilsDir,
    /// Local Node.js runtimes, one subdirectory per version
    NodeRuntimeDir,
    /// Self-managed uv binary
    UvDir,
    /// Tag of the self-managed uv binary
    UvVersionFile,
    /// Downloaded archives awaiting extraction
    CacheDir,
    /// npm dependency directory
    NodeModules,
    /// npm manifest
    PackageJson,
}

impl StoragePath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstallingMarker => ".installing",
            Self::NodeVersionMarker => ".node-version",
            Self::PythonVersionMarker => "python_version",
            Self::LspUtilsDir => "lsp_utils",
            Self::NodeRuntimeDir => "node-runtime",
            Self::UvDir => "uv",
            Self::UvVersionFile => "VERSION",
            Self::CacheDir => "cache",
            Self::NodeModules => "node_modules",
            Self::PackageJson => "package.json",
        }
    }
}

impl AsRef<Path> for StoragePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for StoragePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for StoragePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
