use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, warn};
use std::io::Read;
use std::path::Path;
use tar::{Archive, EntryType};

use super::{ArchiveExtractor, ArchiveKind, enclosed_path, link_stays_inside, resolves_inside};
use crate::runtime::Runtime;

/// Extractor for gzip-compressed tarballs (`.tar.gz`, `.tgz`).
#[derive(Default)]
pub struct TarGzExtractor;

/// Extractor for plain `.tar` archives.
#[derive(Default)]
pub struct TarExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        ArchiveKind::from_path(archive_path) == Some(ArchiveKind::TarGz)
    }

    fn unpack<R: Runtime>(&self, runtime: &R, archive_path: &Path, dest: &Path) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", dest);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        unpack_tar(runtime, GzDecoder::new(file), dest)
    }
}

impl ArchiveExtractor for TarExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        ArchiveKind::from_path(archive_path) == Some(ArchiveKind::Tar)
    }

    fn unpack<R: Runtime>(&self, runtime: &R, archive_path: &Path, dest: &Path) -> Result<()> {
        debug!("Extracting tar archive to {:?}...", dest);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        unpack_tar(runtime, file, dest)
    }
}

/// Unpack every entry with `Entry::unpack_in`, which refuses to write
/// through a parent that resolves outside `dest`. Entries whose parent
/// already resolves outside, and symlinks pointing out of the package, are
/// skipped beforehand so one hostile entry does not fail the whole archive.
fn unpack_tar<R: Runtime, T: Read>(runtime: &R, reader: T, dest: &Path) -> Result<()> {
    let root = runtime
        .canonicalize(dest)
        .with_context(|| format!("Failed to resolve extraction directory {:?}", dest))?;
    let mut archive = Archive::new(reader);

    for entry in archive.entries().context("Failed to read tar archive")? {
        let mut entry = entry.context("Failed to read tar entry")?;
        let raw_path = entry
            .path()
            .context("Tar entry has an invalid path")?
            .into_owned();

        let Some(entry_path) = enclosed_path(&raw_path) else {
            debug!("Skipping entry with unsafe path {:?}", raw_path);
            continue;
        };
        let full_path = root.join(&entry_path);

        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Directory
            | EntryType::Regular
            | EntryType::Continuous
            | EntryType::Link
            | EntryType::Symlink => {}
            other => {
                debug!("Skipping unsupported tar entry {:?} ({:?})", raw_path, other);
                continue;
            }
        }

        let parent = full_path.parent().unwrap_or(&root);
        if !resolves_inside(runtime, &root, parent) {
            warn!(
                "Skipping {:?}: its directory resolves outside the package",
                raw_path
            );
            continue;
        }

        if entry_type == EntryType::Symlink {
            let Some(target) = entry.link_name().context("Invalid symlink target")? else {
                continue;
            };
            if !link_stays_inside(runtime, &root, &full_path, &target) {
                warn!(
                    "Skipping symlink {:?} -> {:?} leaving the package",
                    raw_path, target
                );
                continue;
            }
        }

        entry
            .unpack_in(&root)
            .with_context(|| format!("Failed to extract {:?}", raw_path))?;
    }

    Ok(())
}
