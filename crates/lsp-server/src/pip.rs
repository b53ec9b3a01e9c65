//! Servers installed with pip into a dedicated virtual environment

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_fs::StorageLayout;

use crate::error::{Error, Result};
use crate::python::{PipVenvManager, executable_name};
use crate::resource::{ServerResource, ServerStatus, settle_install};
use crate::resources::ResourceReader;

/// A server whose executable lives in `<storage>/<package>/<bin>/` after
/// `pip install -r requirements.txt`.
#[derive(Debug)]
pub struct ServerPipResource {
    package_name: String,
    server_binary: String,
    venv: PipVenvManager,
    status: ServerStatus,
}

impl ServerPipResource {
    /// `requirements_path` is relative to the package, e.g.
    /// `requirements.txt`.
    pub fn new(
        layout: &StorageLayout,
        package_name: &str,
        requirements_path: &str,
        server_binary: &str,
        python_binary: impl Into<PathBuf>,
        resources: Arc<dyn ResourceReader>,
    ) -> Result<Self> {
        if package_name.is_empty() {
            return Err(Error::invalid_config("Missing required \"package_name\""));
        }
        if server_binary.is_empty() {
            return Err(Error::invalid_config("Missing required \"server_binary\""));
        }
        let requirements = format!(
            "Packages/{package_name}/{}",
            requirements_path.trim_start_matches('/')
        );
        Ok(Self {
            package_name: package_name.to_string(),
            server_binary: server_binary.to_string(),
            venv: PipVenvManager::new(
                layout.package_storage(package_name),
                requirements,
                python_binary,
                resources,
            ),
            status: ServerStatus::Uninitialized,
        })
    }

    pub fn venv(&self) -> &PipVenvManager {
        &self.venv
    }

    pub fn venv_path(&self) -> &Path {
        self.venv.venv_path()
    }
}

impl ServerResource for ServerPipResource {
    fn needs_installation(&mut self) -> Result<bool> {
        if self.venv.needs_install_or_update()? || !self.binary_path().is_file() {
            return Ok(true);
        }
        self.status = ServerStatus::Ready;
        Ok(false)
    }

    fn install_or_update(&mut self) -> Result<()> {
        let outcome = self.venv.install();
        settle_install(&self.package_name, &mut self.status, outcome)
    }

    fn status(&self) -> ServerStatus {
        self.status
    }

    fn binary_path(&self) -> PathBuf {
        self.venv
            .venv_bin_path()
            .join(executable_name(&self.server_binary))
    }

    fn server_directory_path(&self) -> PathBuf {
        self.venv.venv_path().to_path_buf()
    }
}
