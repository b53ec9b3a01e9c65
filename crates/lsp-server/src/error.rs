//! Error types for lsp-server

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Runtime error: {0}")]
    Runtime(#[from] lsp_runtime::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] lsp_fs::Error),

    #[error("{message}")]
    InvalidConfig { message: String },

    #[error("Missing required \"{manifest}\" in {location}")]
    MissingManifest { manifest: String, location: String },

    #[error("Resource not found: {path}")]
    ResourceNotFound { path: String },

    #[error("Error installing the server {package}:\n{source}")]
    InstallFailed {
        package: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
