//! End-to-end integration test for runtime acquisition
//!
//! This test exercises the complete flow: settings file -> runtime
//! resolution (system too old, local download) -> npm server install.

#![cfg(unix)]

use std::fs;
use std::sync::Arc;

use lsp_fs::StorageLayout;
use lsp_runtime::node::NodeRuntime;
use lsp_runtime::{NodeDistribution, Platform, RuntimeContext, RuntimeSettings};
use lsp_server::{
    DirectoryResources, NpmServerOptions, ServerNpmResource, ServerResource, ServerStatus,
};
use lsp_test_utils::TestStorage;
use lsp_test_utils::archive;
use lsp_test_utils::http::FileServer;
use lsp_test_utils::runtime::{fake_path_node, node_executable};
use pretty_assertions::assert_eq;

/// Serve a Node.js distribution for the host platform.
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

/// Set up package resources, a too-old system Node.js and a settings file.
fn setup(storage: &TestStorage) -> RuntimeSettings {
    lsp_test_utils::logging::init();
    fake_path_node(&storage.root().join("bin"), "14.0.0");
    for package in ["LSP-json", "LSP-yaml"] {
        storage.write_resource(
            &format!("{package}/language-server/package.json"),
            format!(r#"{{"name": "{package}"}}"#),
        );
        storage.write_resource(&format!("{package}/language-server/out/server.js"), "");
    }

    let settings_path = storage.root().join("lsp_utils.sublime-settings");
    fs::write(
        &settings_path,
        serde_json::json!({ "nodejs_runtime": ["system", "local"] }).to_string(),
    )
    .unwrap();
    RuntimeSettings::load(&settings_path).unwrap()
}

fn options(storage: &TestStorage, package: &str) -> NpmServerOptions {
    NpmServerOptions {
        package_name: package.to_string(),
        server_directory: "language-server".to_string(),
        server_binary_path: "language-server/out/server.js".to_string(),
        package_storage: storage.storage_dir().join(package),
        minimum_node_version: (14, 0, 0),
        required_node_version: ">=16.0.0".to_string(),
        skip_npm_install: false,
    }
}

#[test]
fn test_servers_install_on_downloaded_runtime() {
    let storage = TestStorage::new();
    let settings = setup(&storage);
    assert!(!settings.local_use_electron);
    let (server, distribution) = serve_node("18.0.0");
    let context = RuntimeContext::new(StorageLayout::new(storage.storage_dir()), settings)
        .with_path_search(storage.root().join("bin"))
        .with_node_distribution(distribution);
    let resources = Arc::new(DirectoryResources::new(storage.packages_dir()));

    let mut json = ServerNpmResource::create(
        options(&storage, "LSP-json"),
        resources.clone(),
        &context,
    )
    .unwrap();
    assert!(matches!(json.runtime(), NodeRuntime::Local(_)));
    assert_eq!(
        json.node_bin().unwrap(),
        storage
            .storage_dir()
            .join("lsp_utils/node-runtime/18.0.0/node/bin/node")
    );

    assert!(json.needs_installation().unwrap());
    json.install_or_update().unwrap();
    assert_eq!(json.status(), ServerStatus::Ready);
    storage.assert_stored("LSP-json/language-server/node_modules");
    assert_eq!(
        fs::read_to_string(storage.storage_dir().join("LSP-json/.node-version")).unwrap(),
        "18.0.0"
    );

    // A second package reuses the process-wide runtime
    let mut yaml =
        ServerNpmResource::create(options(&storage, "LSP-yaml"), resources, &context).unwrap();
    yaml.install_or_update().unwrap();
    assert!(!yaml.needs_installation().unwrap());
    assert_eq!(server.total_hits(), 1);
    storage.assert_not_stored("lsp_utils/node-runtime/18.0.0/.installing");
}

#[test]
fn test_server_process_command_uses_runtime() {
    let storage = TestStorage::new();
    let settings = setup(&storage);
    let (_server, distribution) = serve_node("20.11.1");
    let context = RuntimeContext::new(StorageLayout::new(storage.storage_dir()), settings)
        .with_path_search(storage.root().join("bin"))
        .with_node_distribution(distribution);

    let resource = ServerNpmResource::create(
        options(&storage, "LSP-json"),
        Arc::new(DirectoryResources::new(storage.packages_dir())),
        &context,
    )
    .unwrap();

    let output = resource
        .runtime()
        .node_command(["--version"])
        .unwrap()
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "v20.11.1");
}
