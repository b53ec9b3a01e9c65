use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_fs::{RobustnessConfig, StorageLayout, checksum, io};

use super::{UvRunner, executable_name, venv_bin_dir};
use crate::error::{Error, Result};
use crate::resources::ResourceReader;

const PYPROJECT: &str = "pyproject.toml";
const UV_LOCK: &str = "uv.lock";

/// A project venv at `<storage>/<package>/.venv`, created with `uv sync`.
///
/// Staleness is decided by comparing `pyproject.toml` and the optional
/// `uv.lock` with the copies kept next to the venv.
pub struct UvVenvManager {
    package_name: String,
    pyproject_path: String,
    storage: PathBuf,
    layout: StorageLayout,
    resources: Arc<dyn ResourceReader>,
    uv: Option<UvRunner>,
}

impl std::fmt::Debug for UvVenvManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UvVenvManager")
            .field("package_name", &self.package_name)
            .field("pyproject_path", &self.pyproject_path)
            .field("storage", &self.storage)
            .field("uv", &self.uv)
            .finish_non_exhaustive()
    }
}

impl UvVenvManager {
    /// `pyproject_path` is the resource path of the package's
    /// `pyproject.toml`; a `uv.lock` next to it is picked up if present.
    pub fn new(
        package_name: impl Into<String>,
        pyproject_path: impl Into<String>,
        layout: &StorageLayout,
        resources: Arc<dyn ResourceReader>,
    ) -> Result<Self> {
        let package_name = package_name.into();
        let pyproject_path = pyproject_path.into();
        if !resources.exists(&pyproject_path) {
            return Err(Error::invalid_config(format!(
                "Expected \"{pyproject_path}\" resource not found"
            )));
        }
        Ok(Self {
            storage: layout.package_storage(&package_name),
            package_name,
            pyproject_path,
            layout: layout.clone(),
            resources,
            uv: None,
        })
    }

    /// Use `runner` instead of locating `uv` on first install.
    pub fn with_uv_runner(mut self, runner: UvRunner) -> Self {
        self.uv = Some(runner);
        self
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage
    }

    pub fn venv_path(&self) -> PathBuf {
        self.storage.join(".venv")
    }

    pub fn venv_bin_path(&self) -> PathBuf {
        venv_bin_dir(&self.venv_path())
    }

    pub fn venv_python_path(&self) -> PathBuf {
        self.venv_bin_path().join(executable_name("python"))
    }

    fn uv_lock_path(&self) -> String {
        match self.pyproject_path.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{UV_LOCK}"),
            None => UV_LOCK.to_string(),
        }
    }

    /// Manifests as (resource path, stored copy).
    fn manifests(&self) -> [(String, PathBuf); 2] {
        [
            (self.pyproject_path.clone(), self.storage.join(PYPROJECT)),
            (self.uv_lock_path(), self.storage.join(UV_LOCK)),
        ]
    }

    pub fn needs_install_or_update(&self) -> Result<bool> {
        if !self.venv_path().is_dir() {
            return Ok(true);
        }
        for (resource, stored) in self.manifests() {
            // An absent optional manifest has nothing to compare
            if !self.resources.exists(&resource) {
                continue;
            }
            let source = self.resources.read_bytes(&resource)?;
            if !checksum::matches_file(&source, &stored)? {
                tracing::debug!("{}: {} changed", self.package_name, resource);
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn install(&mut self) -> Result<()> {
        for (_, stored) in self.manifests() {
            io::remove_file_if_exists(&stored)?;
        }
        io::remove_dir_all(&self.venv_path(), RobustnessConfig::default())?;
        std::fs::create_dir_all(&self.storage)
            .map_err(|e| lsp_fs::Error::io(&self.storage, e))?;

        for (resource, stored) in self.manifests() {
            if self.resources.exists(&resource) {
                self.resources.copy_file(&resource, &stored)?;
            }
        }

        let uv = match &self.uv {
            Some(uv) => uv.clone(),
            None => {
                let uv = UvRunner::new(&self.layout)?;
                self.uv = Some(uv.clone());
                uv
            }
        };
        let output = uv.run_command(["sync"], &self.storage)?;
        tracing::info!("{}: uv sync\n{}", self.package_name, output);
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::resources::DirectoryResources;
    use lsp_test_utils::TestStorage;
    use lsp_test_utils::runtime::fake_uv;

    fn manager(storage: &TestStorage) -> UvVenvManager {
        let uv = fake_uv(&storage.root().join("bin/uv"), "ruff");
        UvVenvManager::new(
            "LSP-ruff",
            "Packages/LSP-ruff/pyproject.toml",
            &StorageLayout::new(storage.storage_dir()),
            Arc::new(DirectoryResources::new(storage.packages_dir())),
        )
        .unwrap()
        .with_uv_runner(UvRunner::from_binary(uv))
    }

    #[test]
    fn test_missing_pyproject_is_config_error() {
        let storage = TestStorage::new();
        let err = UvVenvManager::new(
            "LSP-ruff",
            "Packages/LSP-ruff/pyproject.toml",
            &StorageLayout::new(storage.storage_dir()),
            Arc::new(DirectoryResources::new(storage.packages_dir())),
        )
        .unwrap_err();
        assert!(err.to_string().contains("resource not found"));
    }

    #[test]
    fn test_sync_round_trip() {
        let storage = TestStorage::new();
        storage.write_resource("LSP-ruff/pyproject.toml", "[project]\nname = \"ruff-server\"\n");
        storage.write_resource("LSP-ruff/uv.lock", "version = 1\n");
        let mut manager = manager(&storage);

        assert!(manager.needs_install_or_update().unwrap());
        manager.install().unwrap();
        assert!(manager.venv_python_path().is_file());
        storage.assert_stored("LSP-ruff/uv.lock");
        assert!(!manager.needs_install_or_update().unwrap());
    }

    #[test]
    fn test_lock_change_is_stale() {
        let storage = TestStorage::new();
        storage.write_resource("LSP-ruff/pyproject.toml", "[project]\n");
        storage.write_resource("LSP-ruff/uv.lock", "version = 1\n");
        let mut manager = manager(&storage);
        manager.install().unwrap();

        storage.write_resource("LSP-ruff/uv.lock", "version = 2\n");
        assert!(manager.needs_install_or_update().unwrap());
    }

    #[test]
    fn test_lockfile_is_optional() {
        let storage = TestStorage::new();
        storage.write_resource("LSP-ruff/pyproject.toml", "[project]\n");
        let mut manager = manager(&storage);
        manager.install().unwrap();

        assert!(!manager.needs_install_or_update().unwrap());
        storage.assert_not_stored("LSP-ruff/uv.lock");
    }
}
