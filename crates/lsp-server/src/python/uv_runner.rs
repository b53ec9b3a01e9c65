//! Locating, and if needed bootstrapping, the `uv` binary
//!
//! A `uv` on `PATH` always wins. Otherwise a pinned release is kept under
//! `<storage>/lsp_utils/uv/` together with a `VERSION` file naming the tag it
//! was downloaded from; a missing binary or a different tag triggers a fresh
//! download.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use lsp_fs::io::{self, RemoveOnDrop};
use lsp_fs::{StorageLayout, StoragePath, download_file, extract_archive};
use lsp_runtime::{Arch, CommandLine, Os, Platform, run_command_sync};

use crate::error::{Error, Result};

pub const UV_TAG: &str = "0.9.26";
pub const UV_DIST_URL: &str = "https://github.com/astral-sh/uv/releases/download";

/// Which `uv` release to bootstrap and where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvDistribution {
    pub tag: String,
    pub base_url: String,
}

impl Default for UvDistribution {
    fn default() -> Self {
        Self {
            tag: UV_TAG.to_string(),
            base_url: UV_DIST_URL.to_string(),
        }
    }
}

impl UvDistribution {
    pub fn download_url(&self, artifact: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.tag,
            artifact
        )
    }
}

/// Release artifact for `platform`, e.g. `uv-aarch64-apple-darwin.tar.gz`.
pub fn uv_artifact_name(platform: Platform) -> Result<String> {
    let arch = match platform.arch {
        Arch::X64 => "x86_64",
        Arch::Arm64 => "aarch64",
        Arch::X32 => {
            return Err(lsp_runtime::Error::UnsupportedPlatform {
                os: platform.os.to_string(),
                arch: platform.arch.to_string(),
            }
            .into());
        }
    };
    let (target, extension) = match platform.os {
        Os::Windows => ("pc-windows-msvc", "zip"),
        Os::Osx => ("apple-darwin", "tar.gz"),
        Os::Linux => ("unknown-linux-gnu", "tar.gz"),
    };
    Ok(format!("uv-{arch}-{target}.{extension}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvRunner {
    binary: PathBuf,
}

impl UvRunner {
    /// `uv` from `PATH`, or the managed copy with the default distribution.
    pub fn new(layout: &StorageLayout) -> Result<Self> {
        Self::locate(layout, None, &UvDistribution::default())
    }

    /// Like [`Self::new`], searching `search_path` instead of the process
    /// `PATH` when given.
    pub fn locate(
        layout: &StorageLayout,
        search_path: Option<&OsStr>,
        distribution: &UvDistribution,
    ) -> Result<Self> {
        let found = match search_path {
            None => which::which("uv").ok(),
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_default();
                which::which_in("uv", Some(OsString::from(paths)), cwd).ok()
            }
        };
        if let Some(binary) = found {
            tracing::debug!("Using uv from PATH: {}", binary.display());
            return Ok(Self { binary });
        }
        Self::managed(&layout.uv_dir(), distribution, Platform::current())
    }

    /// The self-managed `uv` in `dir`, downloading it when missing or when
    /// `VERSION` does not name `distribution.tag`.
    pub fn managed(dir: &Path, distribution: &UvDistribution, platform: Platform) -> Result<Self> {
        let binary_name = if platform.is_windows() {
            "uv.exe"
        } else {
            "uv"
        };
        let binary = dir.join(binary_name);
        let version_file = dir.join(StoragePath::UvVersionFile);

        let installed = io::read_text_optional(&version_file)?;
        if binary.is_file() && installed.as_deref().map(str::trim) == Some(distribution.tag.as_str())
        {
            return Ok(Self { binary });
        }

        let artifact = uv_artifact_name(platform)?;
        let url = distribution.download_url(&artifact);
        tracing::info!("Downloading uv {} from {}", distribution.tag, url);

        fs::create_dir_all(dir).map_err(|e| lsp_fs::Error::io(dir, e))?;
        // Staged inside `dir` so the final rename stays on one filesystem
        let staging = tempfile::Builder::new()
            .prefix(".download")
            .tempdir_in(dir)
            .map_err(|e| lsp_fs::Error::io(dir, e))?;
        let archive = RemoveOnDrop::new(staging.path().join(&artifact));
        download_file(&url, archive.path())?;

        let extract_dir = staging.path().join("extracted");
        let extracted = extract_archive(archive.path(), &extract_dir)?;
        let unpacked = [extracted.join(binary_name), extract_dir.join(binary_name)]
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::ResourceNotFound {
                path: format!("{artifact}/{binary_name}"),
            })?;

        io::remove_file_if_exists(&binary)?;
        fs::rename(&unpacked, &binary).map_err(|e| lsp_fs::Error::io(&binary, e))?;
        io::set_executable(&binary)?;
        io::write_text(&version_file, &distribution.tag)?;
        tracing::info!("Installed uv {} to {}", distribution.tag, binary.display());
        Ok(Self { binary })
    }

    /// Use a specific `uv` binary.
    pub fn from_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run `uv <args>` in `cwd` and return its output.
    pub fn run_command<I, S>(&self, args: I, cwd: &Path) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let command = CommandLine::new(&self.binary).args(args).current_dir(cwd);
        Ok(run_command_sync(&command)?)
    }
}
