//! Node.js distribution managed under package storage
//!
//! Layout under `<runtime_dir>/<version>/`:
//!
//! ```text
//! .installing        present while an install is in progress
//! cache/             downloaded archives (removed after extraction)
//! node/              extracted distribution, renamed from its versioned root
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use lsp_fs::io::{self, RemoveOnDrop};
use lsp_fs::{RobustnessConfig, StoragePath, download_file, extract_archive};
use semver::Version;

use crate::error::{Error, Result};
use crate::platform::{Arch, Os, Platform};

pub const DEFAULT_NODE_VERSION: &str = "22.18.0";
pub const NODE_DIST_URL: &str = "https://nodejs.org/dist";

/// Which Node.js release to install and where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDistribution {
    pub version: String,
    pub base_url: String,
}

impl Default for NodeDistribution {
    fn default() -> Self {
        Self {
            version: DEFAULT_NODE_VERSION.to_string(),
            base_url: NODE_DIST_URL.to_string(),
        }
    }
}

impl NodeDistribution {
    /// `node-v{version}-{os}-{arch}.{zip|tar.gz}` for the given platform.
    pub fn archive_name(&self, platform: Platform) -> Result<String> {
        let (node_os, extension) = match (platform.os, platform.arch) {
            (Os::Windows, Arch::X64) => ("win", "zip"),
            (Os::Linux, Arch::X64 | Arch::Arm64) => ("linux", "tar.gz"),
            (Os::Osx, Arch::X64 | Arch::Arm64) => ("darwin", "tar.gz"),
            (os, arch) => {
                return Err(Error::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                });
            }
        };
        Ok(format!(
            "node-v{}-{}-{}.{}",
            self.version, node_os, platform.arch, extension
        ))
    }

    pub fn download_url(&self, archive_name: &str) -> String {
        format!(
            "{}/v{}/{}",
            self.base_url.trim_end_matches('/'),
            self.version,
            archive_name
        )
    }
}

/// A Node.js distribution installed (or to be installed) under package
/// storage.
#[derive(Debug)]
pub struct LocalRuntime {
    base_dir: PathBuf,
    distribution: NodeDistribution,
    platform: Platform,
    pub(crate) version: OnceLock<Version>,
}

impl LocalRuntime {
    pub fn new(runtime_dir: &Path, distribution: NodeDistribution) -> Self {
        Self {
            base_dir: runtime_dir.join(&distribution.version),
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

    fn node_dir(&self) -> PathBuf {
        self.base_dir.join("node")
    }

    fn is_installing(&self) -> bool {
        self.marker_path().is_file()
    }

    /// `node/node.exe` or `node/bin/node`; `None` while installing.
    pub fn node_bin(&self) -> Option<PathBuf> {
        if self.is_installing() {
            return None;
        }
        let node_dir = self.node_dir();
        [node_dir.join("node.exe"), node_dir.join("bin").join("node")]
            .into_iter()
            .find(|candidate| candidate.is_file())
    }

    /// npm's entry script, run through the bundled node binary.
    pub fn npm_cli(&self) -> Option<PathBuf> {
        if self.is_installing() {
            return None;
        }
        let node_dir = self.node_dir();
        let mut lib = node_dir.join("lib").join(StoragePath::NodeModules);
        if !lib.is_dir() {
            lib = node_dir.join(StoragePath::NodeModules);
        }
        let npm_cli = lib.join("npm").join("bin").join("npm-cli.js");
        npm_cli.is_file().then_some(npm_cli)
    }

    pub fn additional_paths(&self) -> Vec<PathBuf> {
        self.node_bin()
            .and_then(|node| node.parent().map(Path::to_path_buf))
            .into_iter()
            .collect()
    }

    /// Download and unpack the distribution into [`Self::base_dir`].
    pub fn install(&self) -> Result<()> {
        let marker = self.marker_path();
        io::create_marker(&marker)?;

        let archive_name = self.distribution.archive_name(self.platform)?;
        let url = self.distribution.download_url(&archive_name);
        tracing::info!("Downloading Node.js {} from {}", self.distribution.version, url);

        let cache_dir = self.base_dir.join(StoragePath::CacheDir);
        fs::create_dir_all(&cache_dir).map_err(|e| lsp_fs::Error::io(&cache_dir, e))?;
        let archive = RemoveOnDrop::new(cache_dir.join(&archive_name));
        if !archive.path().is_file() {
            download_file(&url, archive.path())?;
        }

        let extracted = extract_archive(archive.path(), &self.base_dir)?;
        if extracted == self.base_dir {
            return Err(Error::InstallFailed {
                runtime: format!("Node.js {}", self.distribution.version),
                message: format!("{archive_name} has no single top-level directory"),
            });
        }

        let node_dir = self.node_dir();
        io::remove_dir_all(&node_dir, RobustnessConfig::default())?;
        fs::rename(&extracted, &node_dir).map_err(|e| lsp_fs::Error::io(&extracted, e))?;

        io::remove_marker(&marker)?;
        tracing::info!("Installed Node.js {} to {}", self.distribution.version, node_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(Os::Windows, Arch::X64, "node-v22.18.0-win-x64.zip")]
    #[case(Os::Linux, Arch::X64, "node-v22.18.0-linux-x64.tar.gz")]
    #[case(Os::Linux, Arch::Arm64, "node-v22.18.0-linux-arm64.tar.gz")]
    #[case(Os::Osx, Arch::Arm64, "node-v22.18.0-darwin-arm64.tar.gz")]
    fn test_archive_name(#[case] os: Os, #[case] arch: Arch, #[case] expected: &str) {
        let name = NodeDistribution::default()
            .archive_name(Platform::new(os, arch))
            .unwrap();
        assert_eq!(name, expected);
    }

    #[rstest]
    #[case(Os::Windows, Arch::Arm64)]
    #[case(Os::Linux, Arch::X32)]
    #[case(Os::Windows, Arch::X32)]
    fn test_unsupported_platform(#[case] os: Os, #[case] arch: Arch) {
        let result = NodeDistribution::default().archive_name(Platform::new(os, arch));
        assert!(matches!(result, Err(Error::UnsupportedPlatform { .. })));
    }

    #[test]
    fn test_download_url() {
        let distribution = NodeDistribution::default();
        assert_eq!(
            distribution.download_url("node-v22.18.0-linux-x64.tar.gz"),
            "https://nodejs.org/dist/v22.18.0/node-v22.18.0-linux-x64.tar.gz"
        );
    }

    #[test]
    fn test_versioned_base_dir() {
        let temp = TempDir::new().unwrap();
        let runtime = LocalRuntime::new(temp.path(), NodeDistribution::default());
        assert_eq!(runtime.base_dir(), temp.path().join("22.18.0"));
        assert_eq!(runtime.marker_path(), temp.path().join("22.18.0/.installing"));
    }

    #[cfg(unix)]
    #[test]
    fn test_marker_hides_binaries() {
        let temp = TempDir::new().unwrap();
        let runtime = LocalRuntime::new(temp.path(), NodeDistribution::default());
        lsp_test_utils::runtime::fake_node_dist(&runtime.base_dir().join("node"), "22.18.0");

        assert!(runtime.node_bin().is_some());
        assert!(runtime.npm_cli().is_some());
        assert_eq!(
            runtime.additional_paths(),
            vec![runtime.base_dir().join("node/bin")]
        );

        io::create_marker(&runtime.marker_path()).unwrap();
        assert!(runtime.node_bin().is_none());
        assert!(runtime.npm_cli().is_none());
    }

    #[test]
    fn test_unsupported_platform_fails_before_download() {
        let temp = TempDir::new().unwrap();
        let runtime = LocalRuntime::new(temp.path(), NodeDistribution::default())
            .with_platform(Platform::new(Os::Linux, Arch::X32));

        let result = runtime.install();
        assert!(matches!(result, Err(Error::UnsupportedPlatform { .. })));
        // Interrupted install stays visible to the next resolution
        assert!(runtime.marker_path().is_file());
    }
}
