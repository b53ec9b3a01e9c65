//! Archive extraction
//!
//! Extracts `.zip`, `.tar.gz`/`.tgz`, `.tar.bz2`, `.tar.xz` and `.tar`
//! archives. Member names are
//! validated before anything is written, and the effective root of the
//! extracted tree is reported so callers can move it without knowing the
//! archive's internal layout.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use xz2::read::XzDecoder;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
    Tar,
}

impl ArchiveKind {
    fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.ends_with(".zip") || name.ends_with(".vsix") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    fn member_names(self, archive: &Path) -> Result<Vec<String>> {
        match self {
            Self::Zip => {
                let zip = open_zip(archive)?;
                Ok(zip.file_names().map(str::to_string).collect())
            }
            Self::TarGz | Self::TarBz2 | Self::TarXz | Self::Tar => {
                let mut tar = open_tar(archive, self)?;
                let mut names = Vec::new();
                let entries = tar.entries().map_err(|e| Error::archive(archive, e))?;
                for entry in entries {
                    let entry = entry.map_err(|e| Error::archive(archive, e))?;
                    if entry.header().entry_type() == tar::EntryType::XGlobalHeader {
                        continue;
                    }
                    names.push(String::from_utf8_lossy(&entry.path_bytes()).into_owned());
                }
                Ok(names)
            }
        }
    }

    fn unpack(self, archive: &Path, target: &Path) -> Result<()> {
        match self {
            Self::Zip => unpack_zip(archive, target),
            Self::TarGz | Self::TarBz2 | Self::TarXz | Self::Tar => {
                let mut tar = open_tar(archive, self)?;
                tar.set_preserve_permissions(true);
                tar.unpack(target).map_err(|e| Error::archive(archive, e))
            }
        }
    }
}

fn open_zip(archive: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(archive).map_err(|e| Error::io(archive, e))?;
    zip::ZipArchive::new(file).map_err(|e| Error::archive(archive, e))
}

fn open_tar(archive: &Path, kind: ArchiveKind) -> Result<tar::Archive<Box<dyn Read>>> {
    let file = File::open(archive).map_err(|e| Error::io(archive, e))?;
    let reader: Box<dyn Read> = match kind {
        ArchiveKind::TarGz => Box::new(GzDecoder::new(file)),
        ArchiveKind::TarBz2 => Box::new(BzDecoder::new(file)),
        ArchiveKind::TarXz => Box::new(XzDecoder::new(file)),
        ArchiveKind::Zip | ArchiveKind::Tar => Box::new(file),
    };
    Ok(tar::Archive::new(reader))
}

fn unpack_zip(archive: &Path, target: &Path) -> Result<()> {
    let mut zip = open_zip(archive)?;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| Error::archive(archive, e))?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            return Err(Error::MaliciousArchive {
                members: vec![entry.name().to_string()],
            });
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| Error::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut out_file = File::create(&out_path).map_err(|e| Error::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out_file).map_err(|e| Error::io(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                .map_err(|e| Error::io(&out_path, e))?;
        }
    }
    Ok(())
}

/// Whether an archive member could escape the extraction directory.
pub fn is_unsafe_member(name: &str) -> bool {
    let normalized = name.replace('\\', "/");
    let bytes = normalized.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic();
    normalized.starts_with('/') || has_drive || normalized.split('/').any(|segment| segment == "..")
}

/// The single top-level segment shared by every member, if there is one.
pub fn top_level_directory<S: AsRef<str>>(names: &[S]) -> Option<String> {
    let top_levels: BTreeSet<&str> = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.is_empty())
        .filter_map(|name| name.split('/').next())
        .collect();

    if top_levels.len() == 1 {
        top_levels.into_iter().next().map(str::to_string)
    } else {
        None
    }
}

/// Extract all files from an archive into `target_dir`.
///
/// Returns `target_dir/<root>` when every member shares one top-level
/// directory, otherwise `target_dir` itself.
///
/// # Errors
///
/// - [`Error::UnsupportedArchive`] for unknown extensions
/// - [`Error::MaliciousArchive`] when any member is absolute or traverses
///   upwards; nothing is written in that case
pub fn extract_archive(archive: &Path, target_dir: &Path) -> Result<PathBuf> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = ArchiveKind::from_name(&name).ok_or(Error::UnsupportedArchive { name })?;

    let names = kind.member_names(archive)?;
    let bad_members: Vec<String> = names
        .iter()
        .filter(|name| is_unsafe_member(name))
        .cloned()
        .collect();
    if !bad_members.is_empty() {
        return Err(Error::MaliciousArchive {
            members: bad_members,
        });
    }

    let top_level = top_level_directory(&names);
    fs::create_dir_all(target_dir).map_err(|e| Error::io(target_dir, e))?;
    tracing::debug!(?archive, ?target_dir, "Extracting archive");
    kind.unpack(archive, target_dir)?;

    Ok(match top_level {
        Some(root) => target_dir.join(root),
        None => target_dir.to_path_buf(),
    })
}
