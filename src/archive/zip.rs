use anyhow::{Context, Result};
use log::debug;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::{ArchiveExtractor, ArchiveKind};
use crate::runtime::Runtime;

/// Extractor for .zip archives
#[derive(Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        ArchiveKind::from_path(archive_path) == Some(ArchiveKind::Zip)
    }

    fn unpack<R: Runtime>(&self, runtime: &R, archive_path: &Path, dest: &Path) -> Result<()> {
        debug!("Extracting zip archive to {:?}...", dest);
        let mut file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        // ZipArchive needs Read + Seek; Runtime::open only gives Read.
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;
        let mut archive =
            ZipArchive::new(std::io::Cursor::new(buffer)).context("Failed to parse ZIP archive")?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;

            let Some(entry_path) = entry.enclosed_name() else {
                debug!("Skipping entry with unsafe path {:?}", entry.name());
                continue;
            };
            let full_path = dest.join(entry_path);

            if entry.is_dir() {
                runtime.create_dir_all(&full_path)?;
                continue;
            }

            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            {
                let mut dest_file = runtime.create_file(&full_path)?;
                std::io::copy(&mut entry, &mut dest_file)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;
            }

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode & 0o7777)
            {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }
        }

        Ok(())
    }
}
