//! Runtime layer for lsp-utils
//!
//! Locates, installs and validates the Node.js runtime that language servers
//! run on, and provides the command runner used for every subprocess.
//!
//! # Example
//!
//! ```no_run
//! use lsp_fs::StorageLayout;
//! use lsp_runtime::{RuntimeContext, RuntimeRequirement, RuntimeSettings};
//!
//! let context = RuntimeContext::new(
//!     StorageLayout::new("/home/user/.config/sublime-text/Package Storage"),
//!     RuntimeSettings::default(),
//! );
//! let requirement = RuntimeRequirement::parse(">=16.0.0")?;
//! let runtime = context.node_runtime("LSP-json", &requirement)?;
//! println!("node at {:?}", runtime.node_bin());
//! # Ok::<(), lsp_runtime::Error>(())
//! ```

pub mod command;
pub mod context;
pub mod error;
pub mod node;
pub mod platform;
pub mod resolver;
pub mod settings;
pub mod version;

pub use command::{CommandLine, run_command_async, run_command_ex, run_command_sync};
pub use context::{NodeRuntimeCell, RuntimeContext};
pub use error::{Error, Result};
pub use node::{ElectronDistribution, NodeDistribution, NodeRuntime};
pub use platform::{Arch, Os, Platform};
pub use resolver::{DownloadPrompt, LocalSource, PathSource, RuntimeResolver, RuntimeSource};
pub use settings::RuntimeSettings;
pub use version::{RuntimeRequirement, SemanticVersion};
