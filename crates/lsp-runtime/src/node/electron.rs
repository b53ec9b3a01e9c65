//! Electron running as Node, managed under package storage
//!
//! Electron ships no npm, so dependencies are installed with a standalone
//! `yarn.js` run through the Electron binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use lsp_fs::io::{self, RemoveOnDrop};
use lsp_fs::{StoragePath, download_file, extract_archive};
use semver::Version;

use crate::command::{CommandLine, run_command_sync};
use crate::error::{Error, Result};
use crate::platform::{Arch, Os, Platform};

pub const DEFAULT_ELECTRON_VERSION: &str = "37.3.1";
/// Node.js version embedded in [`DEFAULT_ELECTRON_VERSION`].
pub const DEFAULT_ELECTRON_NODE_VERSION: &str = "22.18.0";
pub const ELECTRON_DIST_URL: &str = "https://github.com/electron/electron/releases/download";
pub const YARN_URL: &str =
    "https://github.com/yarnpkg/yarn/releases/download/v1.22.22/yarn-1.22.22.js";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectronDistribution {
    pub electron_version: String,
    pub node_version: String,
    pub base_url: String,
    pub yarn_url: String,
}

impl Default for ElectronDistribution {
    fn default() -> Self {
        Self {
            electron_version: DEFAULT_ELECTRON_VERSION.to_string(),
            node_version: DEFAULT_ELECTRON_NODE_VERSION.to_string(),
            base_url: ELECTRON_DIST_URL.to_string(),
            yarn_url: YARN_URL.to_string(),
        }
    }
}

impl ElectronDistribution {
    pub fn archive_name(&self, platform: Platform) -> Result<String> {
        let platform_code = match platform.os {
            Os::Windows => "win32",
            Os::Linux => "linux",
            Os::Osx => "darwin",
        };
        if platform.arch == Arch::X32 {
            return Err(Error::UnsupportedPlatform {
                os: platform.os.to_string(),
                arch: platform.arch.to_string(),
            });
        }
        Ok(format!(
            "electron-v{}-{}-{}.zip",
            self.electron_version, platform_code, platform.arch
        ))
    }

    pub fn download_url(&self, archive_name: &str) -> String {
        format!(
            "{}/v{}/{}",
            self.base_url.trim_end_matches('/'),
            self.electron_version,
            archive_name
        )
    }
}

#[derive(Debug)]
pub struct ElectronRuntime {
    base_dir: PathBuf,
    distribution: ElectronDistribution,
    platform: Platform,
    pub(crate) version: OnceLock<Version>,
}

impl ElectronRuntime {
    /// Runtimes live under `<runtime_dir>/<embedded node version>`.
    pub fn new(runtime_dir: &Path, distribution: ElectronDistribution) -> Self {
        Self {
            base_dir: runtime_dir.join(&distribution.node_version),
            distribution,
            platform: Platform::current(),
            version: OnceLock::new(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn marker_path(&self) -> PathBuf {
        self.base_dir.join(StoragePath::InstallingMarker)
    }

    fn is_installing(&self) -> bool {
        self.marker_path().is_file()
    }

    pub fn electron_bin(&self) -> Option<PathBuf> {
        if self.is_installing() {
            return None;
        }
        let binary = match self.platform.os {
            Os::Osx => self
                .base_dir
                .join("Electron.app")
                .join("Contents")
                .join("MacOS")
                .join("Electron"),
            Os::Windows => self.base_dir.join("electron.exe"),
            Os::Linux => self.base_dir.join("electron"),
        };
        binary.is_file().then_some(binary)
    }

    pub fn yarn_js(&self) -> Option<PathBuf> {
        if self.is_installing() {
            return None;
        }
        let yarn = self.base_dir.join("yarn.js");
        yarn.is_file().then_some(yarn)
    }

    pub fn yarn_cache_dir(&self) -> PathBuf {
        self.base_dir.join(StoragePath::CacheDir).join("yarn")
    }

    /// Download Electron and the yarn script into [`Self::base_dir`].
    pub fn install(&self) -> Result<()> {
        let marker = self.marker_path();
        io::create_marker(&marker)?;

        let archive_name = self.distribution.archive_name(self.platform)?;
        let url = self.distribution.download_url(&archive_name);
        tracing::info!(
            "Downloading Electron {} (Node.js runtime {}) from {}",
            self.distribution.electron_version,
            self.distribution.node_version,
            url
        );

        let cache_dir = self.base_dir.join(StoragePath::CacheDir);
        fs::create_dir_all(&cache_dir).map_err(|e| lsp_fs::Error::io(&cache_dir, e))?;
        let archive = RemoveOnDrop::new(cache_dir.join(&archive_name));
        if !archive.path().is_file() {
            download_file(&url, archive.path())?;
        }

        if self.platform.is_windows() {
            extract_archive(archive.path(), &self.base_dir)?;
        } else {
            // Native unzip keeps the symlinks inside Electron.app
            let unzip = CommandLine::new("unzip")
                .arg("-o")
                .arg(archive.path())
                .arg("-d")
                .arg(&self.base_dir)
                .current_dir(&cache_dir);
            run_command_sync(&unzip).map_err(|e| Error::InstallFailed {
                runtime: format!("Electron {}", self.distribution.electron_version),
                message: format!("Error unzipping electron archive: {e}"),
            })?;
        }
        drop(archive);

        download_file(&self.distribution.yarn_url, &self.base_dir.join("yarn.js"))?;

        io::remove_marker(&marker)?;
        Ok(())
    }
}
