//! Servers installed with `uv sync` from a bundled `pyproject.toml`

use std::path::PathBuf;
use std::sync::Arc;

use lsp_fs::StorageLayout;

use crate::error::Result;
use crate::python::{UvRunner, UvVenvManager, executable_name};
use crate::resource::{ServerResource, ServerStatus, settle_install};
use crate::resources::ResourceReader;

#[derive(Debug)]
pub struct ServerUvResource {
    server_binary: String,
    venv: UvVenvManager,
    status: ServerStatus,
}

impl ServerUvResource {
    /// `pyproject_path` is relative to the package, e.g. `pyproject.toml`.
    pub fn new(
        layout: &StorageLayout,
        package_name: &str,
        pyproject_path: &str,
        server_binary: &str,
        resources: Arc<dyn ResourceReader>,
    ) -> Result<Self> {
        let pyproject = format!(
            "Packages/{package_name}/{}",
            pyproject_path.trim_start_matches('/')
        );
        Ok(Self {
            server_binary: server_binary.to_string(),
            venv: UvVenvManager::new(package_name, pyproject, layout, resources)?,
            status: ServerStatus::Uninitialized,
        })
    }

    pub fn with_uv_runner(mut self, runner: UvRunner) -> Self {
        self.venv = self.venv.with_uv_runner(runner);
        self
    }

    pub fn venv(&self) -> &UvVenvManager {
        &self.venv
    }
}

impl ServerResource for ServerUvResource {
    fn needs_installation(&mut self) -> Result<bool> {
        if self.venv.needs_install_or_update()? {
            return Ok(true);
        }
        self.status = ServerStatus::Ready;
        Ok(false)
    }

    fn install_or_update(&mut self) -> Result<()> {
        let outcome = self.venv.install();
        settle_install(self.venv.package_name(), &mut self.status, outcome)
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
        self.venv.venv_path()
    }
}
