//! Error types for lsp-fs

use std::path::PathBuf;

/// Result type for lsp-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in lsp-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("Failed downloading {url}: {message}")]
    Download { url: String, message: String },

    #[error("Unsupported archive \"{name}\"")]
    UnsupportedArchive { name: String },

    #[error("Failed reading archive {path}: {message}")]
    ArchiveRead { path: PathBuf, message: String },

    #[error("Archive appears to be malicious, bad filenames: {members:?}")]
    MaliciousArchive { members: Vec<String> },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ArchiveRead {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
