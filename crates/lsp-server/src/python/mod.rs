//! Python virtual environments for pip- and uv-based servers

mod pip_venv;
mod uv_runner;
mod uv_venv;

pub use pip_venv::{PipVenvManager, default_python_binary};
pub use uv_runner::{UV_DIST_URL, UV_TAG, UvDistribution, UvRunner, uv_artifact_name};
pub use uv_venv::UvVenvManager;

use std::path::{Path, PathBuf};

/// Directory holding executables inside a virtual environment.
pub fn venv_bin_dir(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts")
    } else {
        venv.join("bin")
    }
}

/// `name` with the platform's executable suffix.
pub fn executable_name(name: &str) -> String {
    format!("{name}{}", std::env::consts::EXE_SUFFIX)
}
