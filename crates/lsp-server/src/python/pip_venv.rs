use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_fs::{RobustnessConfig, StoragePath, checksum, io};
use lsp_runtime::{CommandLine, run_command_sync};

use super::{executable_name, venv_bin_dir};
use crate::error::{Error, Result};
use crate::resources::ResourceReader;

const REQUIREMENTS_FILE: &str = "requirements.txt";

/// The interpreter used to create virtual environments.
pub fn default_python_binary() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("python")
    } else {
        PathBuf::from("python3")
    }
}

/// A venv populated with `pip install -r requirements.txt`.
///
/// The venv root also holds a copy of the requirements file and a
/// `python_version` marker with the interpreter version that created it.
pub struct PipVenvManager {
    venv_path: PathBuf,
    requirements_path: String,
    python_binary: PathBuf,
    resources: Arc<dyn ResourceReader>,
}

impl std::fmt::Debug for PipVenvManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipVenvManager")
            .field("venv_path", &self.venv_path)
            .field("requirements_path", &self.requirements_path)
            .field("python_binary", &self.python_binary)
            .finish_non_exhaustive()
    }
}

impl PipVenvManager {
    /// `requirements_path` is a resource path such as
    /// `Packages/LSP-pyright/requirements.txt`.
    pub fn new(
        venv_path: impl Into<PathBuf>,
        requirements_path: impl Into<String>,
        python_binary: impl Into<PathBuf>,
        resources: Arc<dyn ResourceReader>,
    ) -> Self {
        Self {
            venv_path: venv_path.into(),
            requirements_path: requirements_path.into(),
            python_binary: python_binary.into(),
            resources,
        }
    }

    pub fn venv_path(&self) -> &Path {
        &self.venv_path
    }

    pub fn venv_bin_path(&self) -> PathBuf {
        venv_bin_dir(&self.venv_path)
    }

    pub fn pip_path(&self) -> PathBuf {
        self.venv_bin_path().join(executable_name("pip"))
    }

    fn version_marker(&self) -> PathBuf {
        self.venv_path.join(StoragePath::PythonVersionMarker)
    }

    fn stored_requirements(&self) -> PathBuf {
        self.venv_path.join(REQUIREMENTS_FILE)
    }

    /// Version reported by `python --version`, e.g. `Python 3.12.1`.
    pub fn python_version(&self) -> Result<String> {
        Ok(run_command_sync(
            &CommandLine::new(&self.python_binary).arg("--version"),
        )?)
    }

    pub fn needs_install_or_update(&self) -> Result<bool> {
        if !self.pip_path().is_file() {
            return Ok(true);
        }
        let stored = io::read_text_optional(&self.version_marker())?;
        if stored.as_deref().map(str::trim) != Some(self.python_version()?.as_str()) {
            return Ok(true);
        }
        if !self.resources.exists(&self.requirements_path) {
            return Err(Error::MissingManifest {
                manifest: REQUIREMENTS_FILE.to_string(),
                location: self.requirements_path.clone(),
            });
        }
        let source = self.resources.read_bytes(&self.requirements_path)?;
        Ok(!checksum::matches_file(&source, &self.stored_requirements())?)
    }

    pub fn install(&self) -> Result<()> {
        if let Err(e) = io::remove_dir_all(&self.venv_path, RobustnessConfig::default()) {
            tracing::warn!("Failed to remove old venv: {}", e);
        }

        run_command_sync(
            &CommandLine::new(&self.python_binary)
                .arg("-m")
                .arg("venv")
                .arg(&self.venv_path),
        )?;

        let requirements = self.stored_requirements();
        self.resources
            .copy_file(&self.requirements_path, &requirements)?;

        let output = run_command_sync(
            &CommandLine::new(self.pip_path())
                .arg("install")
                .arg("-r")
                .arg(&requirements)
                .arg("--disable-pip-version-check")
                .current_dir(&self.venv_path),
        )?;
        tracing::debug!("pip install output:\n{}", output);

        io::write_text(&self.version_marker(), &self.python_version()?)?;
        Ok(())
    }
}
