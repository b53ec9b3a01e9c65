//! Runtime found on the system `PATH`

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::sync::OnceLock;

use semver::Version;

/// `node` and `npm` as located on `PATH` (or a custom search path).
#[derive(Debug, Default)]
pub struct PathRuntime {
    pub(crate) node: Option<PathBuf>,
    pub(crate) npm: Option<PathBuf>,
    pub(crate) version: OnceLock<Version>,
}

impl PathRuntime {
    /// Look up `node` and `npm` on the process `PATH`.
    pub fn probe() -> Self {
        Self::probe_in(None)
    }

    /// Look up `node` and `npm` in `search_path`, or the process `PATH` when
    /// `None`.
    pub fn probe_in(search_path: Option<&OsStr>) -> Self {
        let node = find("node", search_path);
        let npm = find("npm", search_path);
        tracing::debug!(?node, ?npm, "Probed PATH for Node.js");
        Self {
            node,
            npm,
            version: OnceLock::new(),
        }
    }
}

fn find(binary: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    match search_path {
        None => which::which(binary).ok(),
        Some(paths) => {
            let cwd = std::env::current_dir().unwrap_or_default();
            which::which_in(binary, Some(OsString::from(paths)), cwd).ok()
        }
    }
}
