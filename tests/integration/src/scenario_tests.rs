//! Cross-crate scenarios around runtime selection, download prompts and
//! background installation.

#![cfg(unix)]

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lsp_fs::StorageLayout;
use lsp_runtime::{NodeDistribution, Platform, RuntimeContext, RuntimeSettings};
use lsp_server::{DirectoryResources, NpmServerOptions, ServerNpmResource};
use lsp_test_utils::TestStorage;
use lsp_test_utils::archive;
use lsp_test_utils::http::FileServer;
use lsp_test_utils::runtime::{fake_path_node, node_executable};

// =============================================================================
// Fixtures
// =============================================================================

fn serve_node(version: &str) -> (FileServer, NodeDistribution) {
    let mut distribution = NodeDistribution {
        version: version.to_string(),
        base_url: String::new(),
    };
    let archive_name = distribution.archive_name(Platform::current()).unwrap();
    let root = archive_name.trim_end_matches(".tar.gz");
    let node = node_executable(version);
    let node_path = format!("{root}/bin/node");
    let npm_path = format!("{root}/lib/node_modules/npm/bin/npm-cli.js");
    let tarball = archive::tar_gz(&[
        (node_path.as_str(), node.as_bytes(), 0o755),
        (npm_path.as_str(), "// npm\n".as_bytes(), 0o644),
    ]);
    let server = FileServer::builder()
        .file(&format!("/v{version}/{archive_name}"), tarball)
        .start();
    distribution.base_url = server.url().to_string();
    (server, distribution)
}

fn write_settings(storage: &TestStorage, body: &str) -> RuntimeSettings {
    lsp_test_utils::logging::init();
    let path = storage.root().join("lsp_utils.sublime-settings");
    fs::write(&path, body).unwrap();
    RuntimeSettings::load(&path).unwrap()
}

fn write_server(storage: &TestStorage, package: &str) {
    storage.write_resource(&format!("{package}/server/package.json"), "{}");
    storage.write_resource(&format!("{package}/server/index.js"), "");
}

fn options(storage: &TestStorage, package: &str, required: &str) -> NpmServerOptions {
    NpmServerOptions {
        package_name: package.to_string(),
        server_directory: "server".to_string(),
        server_binary_path: "server/index.js".to_string(),
        package_storage: storage.storage_dir().join(package),
        minimum_node_version: (16, 0, 0),
        required_node_version: required.to_string(),
        skip_npm_install: false,
    }
}

/// A download prompt that records how often it was asked.
fn counting_prompt(answer: bool) -> (Arc<AtomicUsize>, impl Fn(&str) -> bool + Send + Sync) {
    let asked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&asked);
    (asked, move |_: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        answer
    })
}

// =============================================================================
// Runtime selection
// =============================================================================

mod selection {
    use super::*;
    use lsp_runtime::node::NodeRuntime;

    #[test]
    fn test_local_first_installs_without_prompt() {
        let storage = TestStorage::new();
        fake_path_node(&storage.root().join("bin"), "22.0.0");
        let settings = write_settings(&storage, r#"{"nodejs_runtime": ["local", "system"]}"#);
        assert!(settings.prefers_local());
        let (server, distribution) = serve_node("18.0.0");
        let (asked, prompt) = counting_prompt(false);

        let context = RuntimeContext::new(StorageLayout::new(storage.storage_dir()), settings)
            .with_path_search(storage.root().join("bin"))
            .with_node_distribution(distribution)
            .with_prompt(prompt);
        let runtime = context
            .node_runtime("LSP-json", &lsp_runtime::RuntimeRequirement::at_least((16, 0, 0)))
            .unwrap();

        assert!(matches!(*runtime, NodeRuntime::Local(_)));
        assert_eq!(asked.load(Ordering::SeqCst), 0);
        assert_eq!(server.total_hits(), 1);
    }

    #[test]
    fn test_outdated_local_versions_are_removed() {
        let storage = TestStorage::new();
        let stale = storage
            .storage_dir()
            .join("lsp_utils/node-runtime/16.20.0/node");
        fs::create_dir_all(&stale).unwrap();
        let settings = write_settings(&storage, r#"{"nodejs_runtime": ["local"]}"#);
        let (_server, distribution) = serve_node("18.0.0");

        let context = RuntimeContext::new(StorageLayout::new(storage.storage_dir()), settings)
            .with_node_distribution(distribution);
        context
            .node_runtime("LSP-json", &lsp_runtime::RuntimeRequirement::parse("18.x").unwrap())
            .unwrap();

        storage.assert_not_stored("lsp_utils/node-runtime/16.20.0");
        storage.assert_stored("lsp_utils/node-runtime/18.0.0/node/bin/node");
    }
}

// =============================================================================
// Declined downloads and terminal failures
// =============================================================================

mod failures {
    use super::*;
    use lsp_server::Error;

    #[test]
    fn test_declined_download_fails_every_server() {
        let storage = TestStorage::new();
        fake_path_node(&storage.root().join("bin"), "14.0.0");
        write_server(&storage, "LSP-json");
        write_server(&storage, "LSP-yaml");
        let settings = write_settings(&storage, "{}");
        let (server, distribution) = serve_node("18.0.0");
        let (asked, prompt) = counting_prompt(false);

        let context = RuntimeContext::new(StorageLayout::new(storage.storage_dir()), settings)
            .with_path_search(storage.root().join("bin"))
            .with_node_distribution(distribution)
            .with_prompt(prompt);
        let resources = Arc::new(DirectoryResources::new(storage.packages_dir()));

        let first = ServerNpmResource::create(
            options(&storage, "LSP-json", ">=16.0.0"),
            resources.clone(),
            &context,
        )
        .unwrap_err();
        match first {
            Error::Runtime(lsp_runtime::Error::ResolutionFailed { log, .. }) => {
                assert!(log.iter().any(|line| line.contains("Expected >=16.0.0, got 14.0.0")));
                assert!(log.iter().any(|line| line.contains("Download skipped")));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let second = ServerNpmResource::create(
            options(&storage, "LSP-yaml", "0.0.0"),
            resources,
            &context,
        )
        .unwrap_err();
        assert!(matches!(
            second,
            Error::Runtime(lsp_runtime::Error::PreviouslyFailed { .. })
        ));
        assert_eq!(asked.load(Ordering::SeqCst), 1);
        assert_eq!(server.total_hits(), 0);
    }

    #[test]
    fn test_stricter_second_requirement_fails_loudly() {
        let storage = TestStorage::new();
        fake_path_node(&storage.root().join("bin"), "18.5.0");
        let settings = write_settings(&storage, r#"{"nodejs_runtime": ["system"]}"#);
        let context = RuntimeContext::new(StorageLayout::new(storage.storage_dir()), settings)
            .with_path_search(storage.root().join("bin"));
        let resources = Arc::new(DirectoryResources::new(storage.packages_dir()));
        write_server(&storage, "LSP-json");
        write_server(&storage, "LSP-css");

        ServerNpmResource::create(options(&storage, "LSP-json", "18.x"), resources.clone(), &context)
            .unwrap();
        let err = ServerNpmResource::create(
            options(&storage, "LSP-css", ">=20.0.0"),
            resources,
            &context,
        )
        .unwrap_err();
        assert!(
            err.to_string()
                .contains("Node.js version requirement failed. Expected >=20.0.0, got 18.5.0")
        );
    }
}

// =============================================================================
// Background installation
// =============================================================================

mod background {
    use super::*;
    use lsp_server::{ServerResource, ServerStatus, install_in_background};
    use std::sync::mpsc;

    #[test]
    fn test_install_in_background_on_resolved_runtime() {
        let storage = TestStorage::new();
        fake_path_node(&storage.root().join("bin"), "20.0.0");
        write_server(&storage, "LSP-json");
        let settings = write_settings(&storage, r#"{"nodejs_runtime": ["system"]}"#);
        let context = RuntimeContext::new(StorageLayout::new(storage.storage_dir()), settings)
            .with_path_search(storage.root().join("bin"));
        let resource = ServerNpmResource::create(
            options(&storage, "LSP-json", ""),
            Arc::new(DirectoryResources::new(storage.packages_dir())),
            &context,
        )
        .unwrap();

        let (tx, rx) = mpsc::channel();
        install_in_background(resource, move |resource, outcome| {
            tx.send((resource.status(), outcome.is_ok(), resource.binary_path()))
                .unwrap();
        })
        .join()
        .unwrap();

        let (status, ok, binary) = rx.recv().unwrap();
        assert!(ok);
        assert_eq!(status, ServerStatus::Ready);
        assert!(binary.is_file());
        storage.assert_stored("LSP-json/server/node_modules");
    }
}
