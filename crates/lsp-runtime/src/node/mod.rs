//! Node.js runtimes
//!
//! [`NodeRuntime`] is the runtime a language server runs on. It is one of:
//!
//! - [`PathRuntime`]: `node`/`npm` found on `PATH`
//! - [`LocalRuntime`]: a Node.js distribution installed under package storage
//! - [`ElectronRuntime`]: Electron with `ELECTRON_RUN_AS_NODE`, plus `yarn.js`
//!
//! All three expose the same capabilities: locate binaries, resolve the
//! version, build the environment overlay and install dependencies. The two
//! managed variants can also install themselves.

pub mod electron;
pub mod local;
pub mod path;

pub use electron::{ElectronDistribution, ElectronRuntime};
pub use local::{LocalRuntime, NodeDistribution};
pub use path::PathRuntime;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use semver::Version;

use crate::command::{CommandLine, run_command_sync};
use crate::error::{Error, Result};
use crate::version::{RuntimeRequirement, parse_version};

#[derive(Debug)]
pub enum NodeRuntime {
    Path(PathRuntime),
    Local(LocalRuntime),
    Electron(ElectronRuntime),
}

impl NodeRuntime {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "PATH",
            Self::Local(_) => "local",
            Self::Electron(_) => "electron",
        }
    }

    /// Binary that executes JavaScript (`node`, or the Electron executable).
    pub fn node_bin(&self) -> Option<PathBuf> {
        match self {
            Self::Path(runtime) => runtime.node.clone(),
            Self::Local(runtime) => runtime.node_bin(),
            Self::Electron(runtime) => runtime.electron_bin(),
        }
    }

    /// Program and leading arguments of the package manager.
    pub fn npm_command(&self) -> Option<Vec<OsString>> {
        match self {
            Self::Path(runtime) => runtime.npm.clone().map(|npm| vec![npm.into_os_string()]),
            Self::Local(runtime) => Some(vec![
                runtime.node_bin()?.into_os_string(),
                runtime.npm_cli()?.into_os_string(),
            ]),
            Self::Electron(runtime) => Some(vec![
                runtime.electron_bin()?.into_os_string(),
                runtime.yarn_js()?.into_os_string(),
            ]),
        }
    }

    /// Environment variables to set on every process started with this runtime.
    pub fn node_env(&self) -> Vec<(String, String)> {
        match self {
            Self::Electron(_) => vec![("ELECTRON_RUN_AS_NODE".to_string(), "true".to_string())],
            Self::Path(_) | Self::Local(_) => Vec::new(),
        }
    }

    /// Directories to prepend to `PATH` so that npm scripts find `node`.
    pub fn additional_paths(&self) -> Vec<PathBuf> {
        match self {
            Self::Local(runtime) => runtime.additional_paths(),
            Self::Path(_) | Self::Electron(_) => Vec::new(),
        }
    }

    pub fn check_binary_present(&self) -> Result<()> {
        if self.node_bin().is_none() {
            return Err(Error::BinaryNotFound {
                binary: "\"node\"".to_string(),
            });
        }
        if self.npm_command().is_none() {
            let binary = match self {
                Self::Electron(_) => "\"yarn.js\"",
                _ => "\"npm\"",
            };
            return Err(Error::BinaryNotFound {
                binary: binary.to_string(),
            });
        }
        Ok(())
    }

    fn version_cell(&self) -> &OnceLock<Version> {
        match self {
            Self::Path(runtime) => &runtime.version,
            Self::Local(runtime) => &runtime.version,
            Self::Electron(runtime) => &runtime.version,
        }
    }

    fn base_command(&self, program: impl AsRef<OsStr>) -> CommandLine {
        CommandLine::new(program)
            .envs(self.node_env())
            .prepend_paths(self.additional_paths())
    }

    /// Run `node --version` once and cache the result.
    pub fn resolve_version(&self) -> Result<Version> {
        if let Some(version) = self.version_cell().get() {
            return Ok(version.clone());
        }
        let node = self.node_bin().ok_or_else(|| Error::BinaryNotFound {
            binary: "\"node\"".to_string(),
        })?;
        let output = run_command_sync(&self.base_command(&node).arg("--version"))?;
        let version = parse_version(&output)?;
        Ok(self.version_cell().get_or_init(|| version).clone())
    }

    pub fn check_satisfies(&self, requirement: &RuntimeRequirement) -> Result<()> {
        let version = self.resolve_version()?;
        if requirement.satisfies_version(&version) {
            Ok(())
        } else {
            Err(Error::VersionMismatch {
                required: requirement.to_string(),
                actual: version.to_string(),
            })
        }
    }

    /// Install production dependencies from the lockfile in `cwd`.
    ///
    /// npm runtimes run `ci --omit=dev --verbose`; Electron runs
    /// `yarn import` followed by a frozen-lockfile production install.
    pub fn run_install(&self, cwd: &Path) -> Result<()> {
        if !cwd.is_dir() {
            return Err(Error::WorkingDirMissing {
                path: cwd.to_path_buf(),
            });
        }
        let npm = self.npm_command().ok_or_else(|| Error::BinaryNotFound {
            binary: "Node.js package manager".to_string(),
        })?;

        let steps: Vec<Vec<OsString>> = match self {
            Self::Electron(runtime) => {
                let mut cache_folder = OsString::from("--cache-folder=");
                cache_folder.push(runtime.yarn_cache_dir());
                vec![
                    vec!["import".into()],
                    vec![
                        "install".into(),
                        "--production".into(),
                        "--frozen-lockfile".into(),
                        cache_folder,
                    ],
                ]
            }
            Self::Path(_) | Self::Local(_) => {
                vec![vec!["ci".into(), "--omit=dev".into(), "--verbose".into()]]
            }
        };

        for args in steps {
            let command = self
                .base_command(&npm[0])
                .args(&npm[1..])
                .args(&args)
                .current_dir(cwd);
            let output = run_command_sync(&command)?;
            tracing::info!("START output of command: \"{}\"", command.display());
            for line in output.lines() {
                tracing::info!("{}", line);
            }
            tracing::info!("Command output END");
        }
        Ok(())
    }

    /// Install the runtime itself. Only the managed variants can do this.
    pub fn install(&self) -> Result<()> {
        match self {
            Self::Local(runtime) => runtime.install(),
            Self::Electron(runtime) => runtime.install(),
            Self::Path(_) => Err(Error::NotInstallable {
                source_id: "system".to_string(),
            }),
        }
    }

    /// A [`Command`] that runs `node <args>` with this runtime's environment,
    /// for starting a language server process.
    pub fn node_command<I, S>(&self, args: I) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let node = self.node_bin().ok_or_else(|| Error::BinaryNotFound {
            binary: "\"node\"".to_string(),
        })?;
        Ok(self.base_command(node).args(args).to_command())
    }
}

impl From<PathRuntime> for NodeRuntime {
    fn from(runtime: PathRuntime) -> Self {
        Self::Path(runtime)
    }
}

impl From<LocalRuntime> for NodeRuntime {
    fn from(runtime: LocalRuntime) -> Self {
        Self::Local(runtime)
    }
}

impl From<ElectronRuntime> for NodeRuntime {
    fn from(runtime: ElectronRuntime) -> Self {
        Self::Electron(runtime)
    }
}
