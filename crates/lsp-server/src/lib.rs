//! Server resources for lsp-utils
//!
//! A server resource materializes a language server into package storage and
//! keeps it current:
//!
//! - [`ServerNpmResource`]: server sources copied from the package, with npm
//!   dependencies installed by the resolved Node.js runtime
//! - [`ServerPipResource`]: a venv populated from `requirements.txt`
//! - [`ServerUvResource`]: a venv synced by uv from `pyproject.toml`
//! - [`ServerVscodeMarketplaceResource`]: an extension downloaded from the
//!   VS Code marketplace
//!
//! All of them implement [`ServerResource`].

pub mod error;
pub mod marketplace;
pub mod npm;
pub mod pip;
pub mod python;
pub mod resource;
pub mod resources;
pub mod uv;

pub use error::{Error, Result};
pub use marketplace::ServerVscodeMarketplaceResource;
pub use npm::{NpmServerOptions, ServerNpmResource};
pub use pip::ServerPipResource;
pub use python::{PipVenvManager, UvRunner, UvVenvManager};
pub use resource::{ServerResource, ServerStatus, install_in_background};
pub use resources::{DirectoryResources, ResourceReader};
pub use uv::ServerUvResource;
