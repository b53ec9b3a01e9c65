use assert_fs::prelude::*;
use lsp_fs::io::{self, RobustnessConfig};
use lsp_fs::StoragePath;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("LSP-json").join(StoragePath::NodeVersionMarker);

    io::write_atomic(&path, b"22.18.0", RobustnessConfig::default()).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "22.18.0");
}

#[test]
fn test_write_atomic_overwrites_and_leaves_no_temp_files() {
    let temp = assert_fs::TempDir::new().unwrap();
    let marker = temp.child("VERSION");
    marker.write_str("0.9.25").unwrap();

    io::write_text(marker.path(), "0.9.26").unwrap();

    marker.assert("0.9.26");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[test]
fn test_remove_dir_all_removes_tree() {
    let temp = assert_fs::TempDir::new().unwrap();
    let payload = temp.child("LSP-json");
    payload.child("server/node_modules/x/index.js").touch().unwrap();

    io::remove_dir_all(payload.path(), RobustnessConfig::default()).unwrap();

    payload.assert(predicate::path::missing());
}

#[test]
fn test_copy_dir_all_copies_nested_files() {
    let temp = assert_fs::TempDir::new().unwrap();
    let src = temp.child("src");
    src.child("package.json").write_str("{}").unwrap();
    src.child("lib/index.js").write_str("module.exports = 1").unwrap();
    let dest = temp.child("dest");

    io::copy_dir_all(src.path(), dest.path()).unwrap();

    dest.child("package.json").assert("{}");
    dest.child("lib/index.js").assert("module.exports = 1");
}

#[test]
fn test_marker_round_trip() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("node-runtime/22.18.0").join(StoragePath::InstallingMarker);

    io::create_marker(&marker).unwrap();
    assert!(marker.is_file());
    assert_eq!(fs::read(&marker).unwrap().len(), 0);

    io::remove_marker(&marker).unwrap();
    assert!(!marker.exists());
}
