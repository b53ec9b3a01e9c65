//! Servers shipped inside a VS Code marketplace extension
//!
//! The `.vsix` for a pinned extension version is downloaded into the host
//! cache and unpacked in place:
//!
//! ```text
//! <cache>/<package>/<vendor.name>~<version>/extension/...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use lsp_fs::io::{self, RemoveOnDrop};
use lsp_fs::{RobustnessConfig, extract_archive, fetch_bytes};

use crate::error::{Error, Result};
use crate::resource::{ServerResource, ServerStatus, settle_install};

pub const MARKETPLACE_URL: &str = "https://marketplace.visualstudio.com/_apis/public/gallery";

const VSIX_NAME: &str = "extension.vsix";

#[derive(Debug, Clone)]
pub struct ServerVscodeMarketplaceResource {
    package_name: String,
    vendor: String,
    name: String,
    version: String,
    binary_path: String,
    cache_path: PathBuf,
    download_base: String,
    status: ServerStatus,
}

impl ServerVscodeMarketplaceResource {
    /// `item_name` is the marketplace id, e.g. `ms-python.vscode-pylance`;
    /// `binary_path` is relative to the unpacked extension.
    pub fn new(
        package_name: &str,
        item_name: &str,
        version: &str,
        binary_path: &str,
        cache_root: impl AsRef<Path>,
    ) -> Result<Self> {
        if package_name.is_empty() || version.is_empty() || binary_path.is_empty() {
            return Err(Error::invalid_config(
                "Marketplace resource needs a package name, version and binary path",
            ));
        }
        let (vendor, name) = match item_name.split_once('.') {
            Some((vendor, name)) if !vendor.is_empty() && !name.is_empty() && !name.contains('.') => {
                (vendor, name)
            }
            _ => {
                return Err(Error::invalid_config(format!(
                    "Invalid extension item name \"{item_name}\", expected \"vendor.name\""
                )));
            }
        };
        let cache_path = cache_root
            .as_ref()
            .join(package_name)
            .join(format!("{item_name}~{version}"));
        Ok(Self {
            package_name: package_name.to_string(),
            vendor: vendor.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            binary_path: binary_path.to_string(),
            cache_path,
            download_base: MARKETPLACE_URL.to_string(),
            status: ServerStatus::Uninitialized,
        })
    }

    /// Fetch from another gallery endpoint.
    pub fn with_download_base(mut self, base: impl Into<String>) -> Self {
        self.download_base = base.into();
        self
    }

    pub fn download_url(&self) -> String {
        format!(
            "{}/publishers/{}/vsextensions/{}/{}/vspackage",
            self.download_base.trim_end_matches('/'),
            self.vendor,
            self.name,
            self.version
        )
    }

    pub fn package_cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Remove the unpacked extension.
    pub fn cleanup(&self) -> Result<()> {
        io::remove_dir_all(&self.cache_path, RobustnessConfig::default())?;
        Ok(())
    }

    fn download_and_extract(&self) -> Result<()> {
        let body = fetch_bytes(&self.download_url())?;
        fs::create_dir_all(&self.cache_path).map_err(|e| lsp_fs::Error::io(&self.cache_path, e))?;

        let vsix = RemoveOnDrop::new(self.cache_path.join(VSIX_NAME));
        fs::write(vsix.path(), &body).map_err(|e| lsp_fs::Error::io(vsix.path(), e))?;
        extract_archive(vsix.path(), &self.cache_path)?;

        let binary = self.binary_path();
        if !binary.is_file() {
            return Err(Error::ResourceNotFound {
                path: binary.display().to_string(),
            });
        }
        Ok(())
    }
}

impl ServerResource for ServerVscodeMarketplaceResource {
    fn needs_installation(&mut self) -> Result<bool> {
        if self.binary_path().is_file() {
            self.status = ServerStatus::Ready;
            return Ok(false);
        }
        Ok(true)
    }

    fn install_or_update(&mut self) -> Result<()> {
        let outcome = self.download_and_extract();
        settle_install(&self.package_name, &mut self.status, outcome)
    }

    fn status(&self) -> ServerStatus {
        self.status
    }

    fn binary_path(&self) -> PathBuf {
        self.cache_path.join(&self.binary_path)
    }

    fn server_directory_path(&self) -> PathBuf {
        self.cache_path.clone()
    }
}
