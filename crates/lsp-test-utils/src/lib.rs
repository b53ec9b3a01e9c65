//! Shared test utilities for the lsp-utils workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`archive`]: in-memory tar.gz, tar.bz2, tar.xz and zip builders
//! - [`http`]: loopback HTTP server for download tests
//! - [`logging`]: `RUST_LOG`-driven tracing output captured per test
//! - [`packages`]: [`TestStorage`] with a fake `Packages/` tree
//! - [`runtime`]: fake Node.js, npm, Python and uv executables

pub mod archive;
pub mod http;
pub mod logging;
pub mod packages;
pub mod runtime;

pub use packages::TestStorage;
