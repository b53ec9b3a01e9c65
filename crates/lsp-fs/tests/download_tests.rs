use lsp_fs::{Error, download_file, fetch_bytes};
use lsp_test_utils::archive;
use lsp_test_utils::http::FileServer;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_download_file_writes_body() {
    let server = FileServer::builder()
        .file("/dist/v18.0.0/SHASUMS256.txt", "abc  node.tar.gz\n")
        .start();
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("SHASUMS256.txt");

    download_file(&format!("{}/dist/v18.0.0/SHASUMS256.txt", server.url()), &target).unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "abc  node.tar.gz\n");
    assert_eq!(server.hits("/dist/v18.0.0/SHASUMS256.txt"), 1);
}

#[test]
fn test_download_file_not_found_is_download_error() {
    let server = FileServer::builder().start();
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("missing.zip");

    let err = download_file(&format!("{}/missing.zip", server.url()), &target).unwrap_err();
    assert!(matches!(err, Error::Download { .. }), "got {err:?}");
    assert!(!target.exists());
}

#[test]
fn test_fetch_bytes_plain() {
    let server = FileServer::builder().file("/plain", "hello").start();
    let bytes = fetch_bytes(&format!("{}/plain", server.url())).unwrap();
    assert_eq!(bytes, b"hello");
}

#[test]
fn test_fetch_bytes_decodes_gzip_encoding() {
    let server = FileServer::builder()
        .file_with_header(
            "/vspackage",
            archive::gzip(b"PK-extension"),
            ("Content-Encoding", "gzip"),
        )
        .start();

    let bytes = fetch_bytes(&format!("{}/vspackage", server.url())).unwrap();
    assert_eq!(bytes, b"PK-extension");
}
