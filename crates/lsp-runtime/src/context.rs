//! Per-process runtime state
//!
//! The Node.js runtime is resolved at most once per process. The outcome,
//! success or failure, is kept in a [`NodeRuntimeCell`] owned by the
//! [`RuntimeContext`] that the host passes to every server resource.

use std::ffi::OsString;
use std::sync::{Arc, OnceLock};

use lsp_fs::StorageLayout;

use crate::error::{Error, Result};
use crate::node::{ElectronDistribution, NodeDistribution, NodeRuntime};
use crate::resolver::{DownloadPrompt, LocalSource, PathSource, RuntimeResolver, RuntimeSource};
use crate::settings::{RuntimeSettings, SOURCE_LOCAL, SOURCE_SYSTEM};
use crate::version::RuntimeRequirement;

/// Single-assignment holder for the resolved runtime.
///
/// The first caller runs the resolver; concurrent first callers wait for it.
/// Later callers only re-check their own requirement against the cached
/// runtime and never trigger another resolution.
#[derive(Debug, Default)]
pub struct NodeRuntimeCell {
    outcome: OnceLock<std::result::Result<Arc<NodeRuntime>, String>>,
}

impl NodeRuntimeCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_resolve(
        &self,
        requirement: &RuntimeRequirement,
        resolver: &RuntimeResolver,
    ) -> Result<Arc<NodeRuntime>> {
        let mut first_error = None;
        let outcome = self.outcome.get_or_init(|| match resolver.resolve(requirement) {
            Ok(runtime) => Ok(Arc::new(runtime)),
            Err(e) => {
                let message = e.to_string();
                first_error = Some(e);
                Err(message)
            }
        });
        if let Some(e) = first_error {
            return Err(e);
        }

        match outcome {
            Ok(runtime) => {
                runtime.check_satisfies(requirement)?;
                Ok(Arc::clone(runtime))
            }
            Err(message) => Err(Error::PreviouslyFailed {
                message: message.clone(),
            }),
        }
    }

    /// The cached runtime, if resolution has run and succeeded.
    pub fn get(&self) -> Option<Arc<NodeRuntime>> {
        self.outcome.get()?.as_ref().ok().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.get().is_some()
    }
}

/// Everything server resources need to obtain a runtime, passed explicitly
/// from the host.
pub struct RuntimeContext {
    layout: StorageLayout,
    settings: RuntimeSettings,
    prompt: Arc<dyn DownloadPrompt>,
    cell: NodeRuntimeCell,
    path_search: Option<OsString>,
    node_distribution: NodeDistribution,
    electron_distribution: ElectronDistribution,
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("layout", &self.layout)
            .field("settings", &self.settings)
            .field("cell", &self.cell)
            .finish_non_exhaustive()
    }
}

impl RuntimeContext {
    /// A context that accepts runtime downloads without asking.
    pub fn new(layout: StorageLayout, settings: RuntimeSettings) -> Self {
        Self {
            layout,
            settings,
            prompt: Arc::new(|_: &str| true),
            cell: NodeRuntimeCell::new(),
            path_search: None,
            node_distribution: NodeDistribution::default(),
            electron_distribution: ElectronDistribution::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl DownloadPrompt + 'static) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }

    /// Search this `PATH`-style list for the system runtime.
    pub fn with_path_search(mut self, path: impl Into<OsString>) -> Self {
        self.path_search = Some(path.into());
        self
    }

    pub fn with_node_distribution(mut self, distribution: NodeDistribution) -> Self {
        self.node_distribution = distribution;
        self
    }

    pub fn with_electron_distribution(mut self, distribution: ElectronDistribution) -> Self {
        self.electron_distribution = distribution;
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn cell(&self) -> &NodeRuntimeCell {
        &self.cell
    }

    /// Sources in the order given by `nodejs_runtime`.
    pub fn sources(&self) -> Vec<Box<dyn RuntimeSource>> {
        let mut sources: Vec<Box<dyn RuntimeSource>> = Vec::new();
        for id in &self.settings.nodejs_runtime {
            match id.as_str() {
                SOURCE_SYSTEM => sources.push(Box::new(match &self.path_search {
                    Some(path) => PathSource::with_search_path(path.clone()),
                    None => PathSource::new(),
                })),
                SOURCE_LOCAL => sources.push(Box::new(
                    LocalSource::new(
                        self.layout.node_runtime_dir(),
                        self.settings.local_use_electron,
                    )
                    .with_node_distribution(self.node_distribution.clone())
                    .with_electron_distribution(self.electron_distribution.clone()),
                )),
                other => tracing::warn!("Ignoring unknown nodejs_runtime entry \"{}\"", other),
            }
        }
        sources
    }

    pub fn resolver(&self, package: &str) -> RuntimeResolver {
        RuntimeResolver::new(package, self.sources(), Arc::clone(&self.prompt))
            .with_local_preferred(self.settings.prefers_local())
    }

    /// The process-wide runtime, resolving it on first use.
    pub fn node_runtime(
        &self,
        package: &str,
        requirement: &RuntimeRequirement,
    ) -> Result<Arc<NodeRuntime>> {
        self.cell
            .get_or_resolve(requirement, &self.resolver(package))
    }
}
