//! In-memory archive builders.
//!
//! Member names are written verbatim into the archive headers so tests can
//! produce hostile archives (`../../etc/passwd`, `/etc/passwd`) that the
//! regular `tar` builder refuses to create.

use bzip2::write::BzEncoder;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{Cursor, Write};
use xz2::write::XzEncoder;

/// One archive member: name, contents and unix mode.
pub type Entry<'a> = (&'a str, &'a [u8], u32);

fn append_entries<W: Write>(writer: W, entries: &[Entry<'_>]) -> W {
    let mut builder = tar::Builder::new(writer);

    for (name, contents, mode) in entries {
        let mut header = tar::Header::new_gnu();
        {
            let raw_name = &mut header.as_old_mut().name;
            assert!(name.len() < raw_name.len(), "tar: name too long: {name}");
            raw_name[..name.len()].copy_from_slice(name.as_bytes());
        }
        if name.ends_with('/') {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
        } else {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(contents.len() as u64);
        }
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append(&header, *contents)
            .unwrap_or_else(|e| panic!("tar: failed to append {name}: {e}"));
    }

    builder
        .into_inner()
        .unwrap_or_else(|e| panic!("tar: failed to finish archive: {e}"))
}

/// Build a `.tar.gz` archive from `entries`.
///
/// # Panics
/// Panics if a name is longer than 100 bytes or writing fails.
pub fn tar_gz(entries: &[Entry<'_>]) -> Vec<u8> {
    append_entries(GzEncoder::new(Vec::new(), Compression::fast()), entries)
        .finish()
        .unwrap_or_else(|e| panic!("tar_gz: failed to finish gzip stream: {e}"))
}

/// Build a `.tar.bz2` archive from `entries`.
pub fn tar_bz2(entries: &[Entry<'_>]) -> Vec<u8> {
    append_entries(BzEncoder::new(Vec::new(), bzip2::Compression::fast()), entries)
        .finish()
        .unwrap_or_else(|e| panic!("tar_bz2: failed to finish bzip2 stream: {e}"))
}

/// Build a `.tar.xz` archive from `entries`.
pub fn tar_xz(entries: &[Entry<'_>]) -> Vec<u8> {
    append_entries(XzEncoder::new(Vec::new(), 1), entries)
        .finish()
        .unwrap_or_else(|e| panic!("tar_xz: failed to finish xz stream: {e}"))
}

/// Build a `.zip` archive from `entries`.
///
/// # Panics
/// Panics if writing fails.
pub fn zip(entries: &[Entry<'_>]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for (name, contents, mode) in entries {
        let options = zip::write::FileOptions::default().unix_permissions(*mode);
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .unwrap_or_else(|e| panic!("zip: failed to add directory {name}: {e}"));
            continue;
        }
        writer
            .start_file(*name, options)
            .unwrap_or_else(|e| panic!("zip: failed to start {name}: {e}"));
        writer
            .write_all(contents)
            .unwrap_or_else(|e| panic!("zip: failed to write {name}: {e}"));
    }

    writer
        .finish()
        .unwrap_or_else(|e| panic!("zip: failed to finish archive: {e}"))
        .into_inner()
}

/// Gzip-compress `data`, as a server would for `Content-Encoding: gzip`.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(data)
        .unwrap_or_else(|e| panic!("gzip: failed to compress: {e}"));
    encoder
        .finish()
        .unwrap_or_else(|e| panic!("gzip: failed to finish: {e}"))
}
