//! Filesystem layer for lsp-utils
//!
//! Provides the package storage layout, installation markers, checksums,
//! crash-safe I/O, the configuration store and the archive fetcher
//! (download + extract) used while bootstrapping runtimes.

pub mod archive;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod download;
pub mod error;
pub mod io;
pub mod layout;

pub use archive::extract_archive;
pub use config::ConfigStore;
pub use constants::StoragePath;
pub use download::{download_file, fetch_bytes};
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use layout::StorageLayout;
