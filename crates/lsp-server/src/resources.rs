//! Read access to resources bundled with a package
//!
//! Resource paths are logical, `/`-separated and rooted at `Packages/`, e.g.
//! `Packages/LSP-json/language-server/package.json`.

use std::fs;
use std::path::{Path, PathBuf};

use lsp_fs::io;

use crate::error::{Error, Result};

const PACKAGES_PREFIX: &str = "Packages/";

/// Reads package resources and copies them into package storage.
pub trait ResourceReader: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    fn read_text(&self, path: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.read_bytes(path)?).into_owned())
    }

    /// Copy a single resource to `dest`, creating parent directories.
    fn copy_file(&self, path: &str, dest: &Path) -> Result<()>;

    /// Recursively copy the resource directory at `path` into `dest`.
    fn copy_tree(&self, path: &str, dest: &Path) -> Result<()>;
}

/// Resources served from an unpacked `Packages/` directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    packages_root: PathBuf,
}

impl DirectoryResources {
    pub fn new(packages_root: impl AsRef<Path>) -> Self {
        Self {
            packages_root: dunce::simplified(packages_root.as_ref()).to_path_buf(),
        }
    }

    pub fn packages_root(&self) -> &Path {
        &self.packages_root
    }

    /// Map a logical resource path to the filesystem.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = path.strip_prefix(PACKAGES_PREFIX).unwrap_or(path);
        let mut resolved = self.packages_root.clone();
        for segment in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." {
                return Err(Error::invalid_config(format!(
                    "Resource path \"{path}\" leaves the packages directory"
                )));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }

    fn existing(&self, path: &str) -> Result<PathBuf> {
        let resolved = self.resolve(path)?;
        if resolved.exists() {
            Ok(resolved)
        } else {
            Err(Error::ResourceNotFound {
                path: path.to_string(),
            })
        }
    }
}

impl ResourceReader for DirectoryResources {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|p| p.exists())
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.existing(path)?;
        Ok(fs::read(&resolved).map_err(|e| lsp_fs::Error::io(&resolved, e))?)
    }

    fn copy_file(&self, path: &str, dest: &Path) -> Result<()> {
        let resolved = self.existing(path)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| lsp_fs::Error::io(parent, e))?;
        }
        fs::copy(&resolved, dest).map_err(|e| lsp_fs::Error::io(dest, e))?;
        Ok(())
    }

    fn copy_tree(&self, path: &str, dest: &Path) -> Result<()> {
        let resolved = self.existing(path)?;
        Ok(io::copy_dir_all(&resolved, dest)?)
    }
}
