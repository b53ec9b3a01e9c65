//! Error types for lsp-runtime

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] lsp_fs::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start {command}: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command {command} failed:\n{output}")]
    CommandFailed { command: String, output: String },

    #[error("{binary} binary not found")]
    BinaryNotFound { binary: String },

    #[error("Invalid version '{input}': {reason}")]
    VersionParse { input: String, reason: String },

    #[error("Invalid version requirement '{requirement}': {reason}")]
    RequirementParse { requirement: String, reason: String },

    #[error("Node.js version requirement failed. Expected {required}, got {actual}")]
    VersionMismatch { required: String, actual: String },

    #[error("Failed resolving Node.js runtime for {package}. Attempts:\n{}", .log.join("\n"))]
    ResolutionFailed { package: String, log: Vec<String> },

    #[error("Node.js runtime resolution failed earlier in this session: {message}")]
    PreviouslyFailed { message: String },

    #[error("Unsupported platform: {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Runtime source '{source_id}' cannot install a runtime")]
    NotInstallable { source_id: String },

    #[error("Specified working directory \"{path}\" does not exist")]
    WorkingDirMissing { path: PathBuf },

    #[error("Installation of {runtime} failed: {message}")]
    InstallFailed { runtime: String, message: String },
}
