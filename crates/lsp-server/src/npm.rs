//! npm-based server resources
//!
//! The server's source tree is copied from the package's bundled resources
//! into package storage and its production dependencies are installed with
//! the resolved Node.js runtime:
//!
//! ```text
//! <package_storage>/.installing          present while an install is running
//! <package_storage>/.node-version        runtime version used for the install
//! <package_storage>/<server_directory>/  copy of the bundled server tree
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use lsp_fs::{RobustnessConfig, StoragePath, checksum, io};
use lsp_runtime::{NodeRuntime, RuntimeContext, RuntimeRequirement, SemanticVersion};

use crate::error::{Error, Result};
use crate::resource::{ServerResource, ServerStatus, settle_install};
use crate::resources::ResourceReader;

/// Configuration of an npm-based server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmServerOptions {
    /// Name of the consuming package, e.g. `LSP-json`.
    pub package_name: String,
    /// Directory of the server inside the package, e.g. `language-server`.
    pub server_directory: String,
    /// Server entry point relative to `package_storage`.
    pub server_binary_path: String,
    pub package_storage: PathBuf,
    pub minimum_node_version: SemanticVersion,
    /// npm-style range; empty or `0.0.0` means "at least the minimum version".
    pub required_node_version: String,
    /// Copy the server tree but do not run the dependency install.
    pub skip_npm_install: bool,
}

impl NpmServerOptions {
    /// The effective runtime requirement for this server.
    pub fn requirement(&self) -> Result<RuntimeRequirement> {
        let required = self.required_node_version.trim();
        if required.is_empty() || required == "0.0.0" {
            Ok(RuntimeRequirement::at_least(self.minimum_node_version))
        } else {
            Ok(RuntimeRequirement::parse(required)?)
        }
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("package_name", &self.package_name),
            ("server_directory", &self.server_directory),
            ("server_binary_path", &self.server_binary_path),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::invalid_config(format!("Missing required \"{name}\"")));
            }
        }
        if self.package_storage.as_os_str().is_empty() {
            return Err(Error::invalid_config("Missing required \"package_storage\""));
        }
        Ok(())
    }
}

/// A server installed with `npm ci` (or yarn on Electron) into package storage.
pub struct ServerNpmResource {
    options: NpmServerOptions,
    resources: Arc<dyn ResourceReader>,
    runtime: Arc<NodeRuntime>,
    status: ServerStatus,
}

impl std::fmt::Debug for ServerNpmResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerNpmResource")
            .field("options", &self.options)
            .field("runtime", &self.runtime)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl ServerNpmResource {
    /// Resolve the process-wide runtime for `options` and build the resource.
    pub fn create(
        options: NpmServerOptions,
        resources: Arc<dyn ResourceReader>,
        context: &RuntimeContext,
    ) -> Result<Self> {
        options.validate()?;
        let requirement = options.requirement()?;
        let runtime = context.node_runtime(&options.package_name, &requirement)?;
        Self::new(options, resources, runtime)
    }

    /// Build the resource around an already resolved runtime.
    pub fn new(
        options: NpmServerOptions,
        resources: Arc<dyn ResourceReader>,
        runtime: Arc<NodeRuntime>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            resources,
            runtime,
            status: ServerStatus::Uninitialized,
        })
    }

    pub fn options(&self) -> &NpmServerOptions {
        &self.options
    }

    pub fn runtime(&self) -> &NodeRuntime {
        &self.runtime
    }

    pub fn node_bin(&self) -> Result<PathBuf> {
        Ok(self.runtime.node_bin().ok_or_else(|| {
            lsp_runtime::Error::BinaryNotFound {
                binary: "\"node\"".to_string(),
            }
        })?)
    }

    pub fn node_env(&self) -> Vec<(String, String)> {
        self.runtime.node_env()
    }

    fn server_source(&self) -> String {
        format!(
            "Packages/{}/{}/",
            self.options.package_name,
            self.options.server_directory.trim_matches('/')
        )
    }

    fn package_json_source(&self) -> String {
        format!("{}{}", self.server_source(), StoragePath::PackageJson)
    }

    fn storage_path(&self, name: StoragePath) -> PathBuf {
        self.options.package_storage.join(name)
    }

    fn is_installed(&self, manifest: &[u8]) -> Result<bool> {
        let dest = self.server_directory_path();
        if !self.options.skip_npm_install && !dest.join(StoragePath::NodeModules).is_dir() {
            return Ok(false);
        }
        if self.storage_path(StoragePath::InstallingMarker).exists() {
            return Ok(false);
        }
        let installed_version =
            io::read_text_optional(&self.storage_path(StoragePath::NodeVersionMarker))?;
        let current_version = self.runtime.resolve_version()?.to_string();
        if installed_version.as_deref().map(str::trim) != Some(current_version.as_str()) {
            return Ok(false);
        }
        Ok(checksum::matches_file(
            manifest,
            &dest.join(StoragePath::PackageJson),
        )?)
    }

    fn install_steps(&self) -> Result<()> {
        let storage = &self.options.package_storage;
        io::remove_dir_all(storage, RobustnessConfig::default())?;
        let version = self.runtime.resolve_version()?;
        std::fs::create_dir_all(storage).map_err(|e| lsp_fs::Error::io(storage, e))?;

        let marker = self.storage_path(StoragePath::InstallingMarker);
        io::create_marker(&marker)?;

        let dest = self.server_directory_path();
        self.resources.copy_tree(&self.server_source(), &dest)?;
        if self.options.skip_npm_install {
            tracing::debug!("{}: Skipping dependency install", self.options.package_name);
        } else {
            self.runtime.run_install(&dest)?;
        }

        io::write_text(
            &self.storage_path(StoragePath::NodeVersionMarker),
            &version.to_string(),
        )?;
        io::remove_marker(&marker)?;
        Ok(())
    }
}

impl ServerResource for ServerNpmResource {
    fn needs_installation(&mut self) -> Result<bool> {
        let source = self.package_json_source();
        if !self.resources.exists(&source) {
            return Err(Error::MissingManifest {
                manifest: StoragePath::PackageJson.to_string(),
                location: self.server_source(),
            });
        }
        let manifest = self.resources.read_bytes(&source)?;
        if self.is_installed(&manifest)? {
            self.status = ServerStatus::Ready;
            return Ok(false);
        }
        Ok(true)
    }

    fn install_or_update(&mut self) -> Result<()> {
        tracing::info!(
            "{}: Installing server using {} runtime",
            self.options.package_name,
            self.runtime.kind()
        );
        let outcome = self.install_steps();
        settle_install(&self.options.package_name, &mut self.status, outcome)
    }

    fn status(&self) -> ServerStatus {
        self.status
    }

    fn binary_path(&self) -> PathBuf {
        self.options
            .package_storage
            .join(&self.options.server_binary_path)
    }

    fn server_directory_path(&self) -> PathBuf {
        self.options
            .package_storage
            .join(self.options.server_directory.trim_matches('/'))
    }
}
