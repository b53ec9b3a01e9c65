//! The server resource contract

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

/// Installation state of a server resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerStatus {
    #[default]
    Uninitialized,
    Error,
    Ready,
}

/// A language server that is installed into, and run from, package storage.
///
/// [`binary_path`](Self::binary_path) is only meaningful once
/// [`status`](Self::status) is [`ServerStatus::Ready`].
pub trait ServerResource: Send {
    /// Whether the installed payload is missing or stale.
    ///
    /// Marks the resource [`ServerStatus::Ready`] when it is up to date.
    fn needs_installation(&mut self) -> Result<bool>;

    /// (Re)install the server. Sets the status to `Ready` or `Error`.
    fn install_or_update(&mut self) -> Result<()>;

    fn status(&self) -> ServerStatus;

    fn binary_path(&self) -> PathBuf;

    fn server_directory_path(&self) -> PathBuf;
}

/// Record the outcome of an installation on `status`, wrapping failures
/// with the package name.
pub(crate) fn settle_install(
    package: &str,
    status: &mut ServerStatus,
    outcome: Result<()>,
) -> Result<()> {
    match outcome {
        Ok(()) => {
            *status = ServerStatus::Ready;
            tracing::info!("{}: Server installed", package);
            Ok(())
        }
        Err(source) => {
            *status = ServerStatus::Error;
            tracing::error!("{}: Error installing the server: {}", package, source);
            Err(Error::InstallFailed {
                package: package.to_string(),
                source: Box::new(source),
            })
        }
    }
}

/// Check and, if needed, install `resource` on a dedicated thread.
///
/// The resource is handed back to `on_done` together with the outcome.
pub fn install_in_background<R, F>(mut resource: R, on_done: F) -> JoinHandle<()>
where
    R: ServerResource + 'static,
    F: FnOnce(R, Result<()>) + Send + 'static,
{
    thread::spawn(move || {
        let outcome = resource.needs_installation().and_then(|needed| {
            if needed {
                resource.install_or_update()
            } else {
                Ok(())
            }
        });
        on_done(resource, outcome);
    })
}
