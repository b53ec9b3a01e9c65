//! Runtime resolution
//!
//! [`RuntimeResolver`] walks an ordered list of [`RuntimeSource`]s and
//! returns the first runtime whose version satisfies the requirement.
//! Sources that can install a runtime are offered the chance to do so when
//! their binaries are missing, after the user agrees to the download.
//! Every attempt is recorded; if no source succeeds the log is returned in
//! [`Error::ResolutionFailed`].

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_fs::RobustnessConfig;

use crate::error::{Error, Result};
use crate::node::{
    ElectronDistribution, ElectronRuntime, LocalRuntime, NodeDistribution, NodeRuntime,
    PathRuntime,
};
use crate::platform::Platform;
use crate::settings::{SOURCE_LOCAL, SOURCE_SYSTEM};
use crate::version::RuntimeRequirement;

/// A place a Node.js runtime can come from.
pub trait RuntimeSource: Send + Sync {
    /// Identifier used in the `nodejs_runtime` setting.
    fn id(&self) -> &str;

    /// Log line announcing an attempt on behalf of `package`.
    fn describe(&self, package: &str) -> String;

    /// The runtime as currently present on disk. Never installs anything.
    fn probe(&self) -> NodeRuntime;

    fn can_install(&self) -> bool {
        false
    }

    /// Install the runtime and return a fresh probe of it.
    fn install(&self) -> Result<NodeRuntime> {
        Err(Error::NotInstallable {
            source_id: self.id().to_string(),
        })
    }
}

/// Asks the user whether a runtime may be downloaded for a package.
pub trait DownloadPrompt: Send + Sync {
    fn confirm_download(&self, package: &str) -> bool;
}

impl<F> DownloadPrompt for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm_download(&self, package: &str) -> bool {
        self(package)
    }
}

/// `node` and `npm` from `PATH`.
#[derive(Debug, Clone, Default)]
pub struct PathSource {
    search_path: Option<OsString>,
}

impl PathSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `path` (a `PATH`-style list) instead of the process `PATH`.
    pub fn with_search_path(path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(path.into()),
        }
    }
}

impl RuntimeSource for PathSource {
    fn id(&self) -> &str {
        SOURCE_SYSTEM
    }

    fn describe(&self, package: &str) -> String {
        format!("Resolving Node.js Runtime in env PATH for package {package}...")
    }

    fn probe(&self) -> NodeRuntime {
        PathRuntime::probe_in(self.search_path.as_deref()).into()
    }
}

/// Node.js (or Electron) managed under `<storage>/lsp_utils/node-runtime`.
#[derive(Debug, Clone)]
pub struct LocalSource {
    runtime_dir: PathBuf,
    use_electron: bool,
    node: NodeDistribution,
    electron: ElectronDistribution,
    platform: Platform,
}

impl LocalSource {
    pub fn new(runtime_dir: impl Into<PathBuf>, use_electron: bool) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
            use_electron,
            node: NodeDistribution::default(),
            electron: ElectronDistribution::default(),
            platform: Platform::current(),
        }
    }

    pub fn with_node_distribution(mut self, distribution: NodeDistribution) -> Self {
        self.node = distribution;
        self
    }

    pub fn with_electron_distribution(mut self, distribution: ElectronDistribution) -> Self {
        self.electron = distribution;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    fn runtime(&self) -> NodeRuntime {
        if self.use_electron {
            ElectronRuntime::new(&self.runtime_dir, self.electron.clone())
                .with_platform(self.platform)
                .into()
        } else {
            LocalRuntime::new(&self.runtime_dir, self.node.clone())
                .with_platform(self.platform)
                .into()
        }
    }

    /// Delete every previously installed runtime version.
    fn remove_outdated(&self) {
        let Ok(entries) = fs::read_dir(&self.runtime_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            tracing::info!("Deleting outdated Node.js runtime directory \"{}\"", path.display());
            if let Err(e) = lsp_fs::io::remove_dir_all(&path, RobustnessConfig::default()) {
                tracing::warn!("Failed deleting {}: {}", path.display(), e);
            }
        }
    }
}

impl RuntimeSource for LocalSource {
    fn id(&self) -> &str {
        SOURCE_LOCAL
    }

    fn describe(&self, package: &str) -> String {
        format!("Resolving Node.js Runtime from lsp_utils for package {package}...")
    }

    fn probe(&self) -> NodeRuntime {
        self.runtime()
    }

    fn can_install(&self) -> bool {
        true
    }

    fn install(&self) -> Result<NodeRuntime> {
        self.remove_outdated();
        self.runtime().install()?;
        Ok(self.runtime())
    }
}

/// Resolves a runtime for one package from an ordered list of sources.
pub struct RuntimeResolver {
    package: String,
    sources: Vec<Box<dyn RuntimeSource>>,
    prompt: Arc<dyn DownloadPrompt>,
    local_preferred: bool,
}

impl std::fmt::Debug for RuntimeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeResolver")
            .field("package", &self.package)
            .field(
                "sources",
                &self.sources.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field("local_preferred", &self.local_preferred)
            .finish_non_exhaustive()
    }
}

impl RuntimeResolver {
    /// The local runtime counts as preferred when it is the first source.
    pub fn new(
        package: impl Into<String>,
        sources: Vec<Box<dyn RuntimeSource>>,
        prompt: Arc<dyn DownloadPrompt>,
    ) -> Self {
        let local_preferred = sources.first().is_some_and(|s| s.id() == SOURCE_LOCAL);
        Self {
            package: package.into(),
            sources,
            prompt,
            local_preferred,
        }
    }

    /// Whether the user listed the local runtime first. Downloads are not
    /// confirmed through the prompt in that case.
    pub fn with_local_preferred(mut self, preferred: bool) -> Self {
        self.local_preferred = preferred;
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Return the first runtime satisfying `requirement`.
    pub fn resolve(&self, requirement: &RuntimeRequirement) -> Result<NodeRuntime> {
        let mut log = vec!["--- lsp_utils Node.js resolving start ---".to_string()];
        let resolved = self.try_sources(requirement, &mut log);

        match resolved {
            Some(runtime) => {
                for line in &log {
                    tracing::debug!("{}", line);
                }
                tracing::info!(
                    "Resolved Node.js Runtime for package {}: {} {:?}",
                    self.package,
                    runtime.kind(),
                    runtime.node_bin()
                );
                Ok(runtime)
            }
            None => {
                log.push("--- lsp_utils Node.js resolving end ---".to_string());
                for line in &log {
                    tracing::info!("{}", line);
                }
                Err(Error::ResolutionFailed {
                    package: self.package.clone(),
                    log,
                })
            }
        }
    }

    fn try_sources(
        &self,
        requirement: &RuntimeRequirement,
        log: &mut Vec<String>,
    ) -> Option<NodeRuntime> {
        for source in &self.sources {
            log.push(source.describe(&self.package));
            let mut runtime = source.probe();

            if let Err(e) = runtime.check_binary_present() {
                if !source.can_install() {
                    log.push(format!(" * Failed: {e}"));
                    continue;
                }
                log.push(format!(" * Binaries check failed: {e}"));
                if !self.local_preferred && !self.prompt.confirm_download(&self.package) {
                    log.push(" * Download skipped".to_string());
                    continue;
                }
                runtime = match source.install() {
                    Ok(installed) => installed,
                    Err(e) => {
                        log.push(format!(" * Failed downloading: {e}"));
                        continue;
                    }
                };
                if let Err(e) = runtime.check_binary_present() {
                    log.push(format!(" * Failed: {e}"));
                    continue;
                }
            }

            match runtime.check_satisfies(requirement) {
                Ok(()) => return Some(runtime),
                Err(e) => log.push(format!(" * {e}")),
            }
        }
        None
    }
}
