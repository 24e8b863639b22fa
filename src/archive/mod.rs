//! Expanding stored archives into package directories.
//!
//! Archives are unpacked into a hidden staging directory next to the target
//! and renamed into place once complete, so a half-extracted package is
//! never visible under its final name.

mod tar;
mod zip;

use anyhow::{Context, bail};
use log::{debug, info, warn};
use std::path::{Component, Path, PathBuf};

use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::error::{Error, Result};
use crate::runtime::{Runtime, is_path_under};
use crate::store::transient_sibling;

pub use self::tar::{TarExtractor, TarGzExtractor};
pub use self::zip::ZipExtractor;

/// Archive formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Tar,
    Zip,
}

/// Recognised suffixes, longest first so `.tar.gz` wins over `.gz`.
const SUFFIXES: &[(&str, ArchiveKind)] = &[
    (".tar.gz", ArchiveKind::TarGz),
    (".tgz", ArchiveKind::TarGz),
    (".tar", ArchiveKind::Tar),
    (".zip", ArchiveKind::Zip),
];

impl ArchiveKind {
    /// Split `file_name` into its stem and archive kind, ignoring case.
    /// `foo-1.0.TGZ` gives `("foo-1.0", TarGz)`.
    pub fn split(file_name: &str) -> Option<(&str, ArchiveKind)> {
        SUFFIXES.iter().find_map(|(suffix, kind)| {
            let start = file_name.len().checked_sub(suffix.len())?;
            let tail = file_name.get(start..)?;
            if start > 0 && tail.eq_ignore_ascii_case(suffix) {
                Some((&file_name[..start], *kind))
            } else {
                None
            }
        })
    }

    pub fn from_path(path: &Path) -> Option<ArchiveKind> {
        let file_name = path.file_name()?.to_str()?;
        Self::split(file_name).map(|(_, kind)| kind)
    }

    /// Canonical file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::Tar => "tar",
            ArchiveKind::Zip => "zip",
        }
    }
}

/// One archive format.
pub trait ArchiveExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Write every entry of the archive below `dest`, which already exists.
    fn unpack<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        dest: &Path,
    ) -> anyhow::Result<()>;
}

/// Picks the format extractor for an archive and manages the staging
/// directory around it.
#[derive(Default)]
pub struct ArchiveExtractorImpl {
    tar_gz: TarGzExtractor,
    tar: TarExtractor,
    zip: ZipExtractor,
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path)
            || self.tar.can_handle(archive_path)
            || self.zip.can_handle(archive_path)
    }

    /// Extract `archive_path` into `<store_root>/<identity>`, where the identity
    /// is the archive's file name without its archive suffix.
    #[tracing::instrument(skip(self, runtime, cleanup))]
    pub fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        store_root: &Path,
        cleanup: &SharedCleanupContext,
    ) -> Result<PathBuf> {
        let identity = archive_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(ArchiveKind::split)
            .map(|(stem, _)| stem.to_string())
            .ok_or_else(|| Error::UnsupportedFormat {
                path: archive_path.to_path_buf(),
            })?;
        self.extract_into(runtime, archive_path, &store_root.join(identity), cleanup)
    }

    /// Extract `archive_path` so that its contents end up in `package_dir`.
    ///
    /// A single top-level directory in the archive becomes `package_dir`
    /// itself; otherwise all top-level entries are placed inside it.
    #[tracing::instrument(skip(self, runtime, cleanup))]
    pub fn extract_into<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        package_dir: &Path,
        cleanup: &SharedCleanupContext,
    ) -> Result<PathBuf> {
        if !self.can_handle(archive_path) {
            return Err(Error::UnsupportedFormat {
                path: archive_path.to_path_buf(),
            });
        }
        if runtime.exists(package_dir) || runtime.is_symlink(package_dir) {
            return Err(Error::AlreadyExtracted {
                path: package_dir.to_path_buf(),
            });
        }

        let extract_error = |source| Error::Extract {
            archive: archive_path.to_path_buf(),
            source,
        };

        let staging = transient_sibling(package_dir, "extract");
        if runtime.exists(&staging) {
            debug!("Removing stale staging directory {:?}", staging);
            runtime.remove_dir_all(&staging).map_err(extract_error)?;
        }
        runtime.create_dir_all(&staging).map_err(extract_error)?;
        let guard = CleanupGuard::new(cleanup.clone(), staging.clone());

        info!("Extracting {:?} to {:?}...", archive_path, package_dir);
        let result = self.unpack_staged(runtime, archive_path, &staging, package_dir);
        if result.is_err() && runtime.exists(&staging) {
            if let Err(e) = runtime.remove_dir_all(&staging) {
                warn!("Failed to remove staging directory {:?}: {:#}", staging, e);
            }
        }
        guard.success();

        result.map_err(extract_error)?;
        Ok(package_dir.to_path_buf())
    }

    fn unpack_staged<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        staging: &Path,
        package_dir: &Path,
    ) -> anyhow::Result<()> {
        if self.tar_gz.can_handle(archive_path) {
            self.tar_gz.unpack(runtime, archive_path, staging)?;
        } else if self.tar.can_handle(archive_path) {
            self.tar.unpack(runtime, archive_path, staging)?;
        } else if self.zip.can_handle(archive_path) {
            self.zip.unpack(runtime, archive_path, staging)?;
        } else {
            bail!("unsupported archive format: {}", archive_path.display());
        }

        let entries = runtime
            .read_dir(staging)
            .context("Failed to read staging directory")?;
        let root = match entries.as_slice() {
            [] => bail!("archive contains no files"),
            [single] if runtime.is_dir(single) && !runtime.is_symlink(single) => single.clone(),
            _ => staging.to_path_buf(),
        };

        debug!("Moving {:?} to {:?}", root, package_dir);
        runtime.rename(&root, package_dir)?;
        if root != staging {
            // Only the now empty staging directory is left.
            if let Err(e) = runtime.remove_dir_all(staging) {
                warn!("Failed to remove staging directory {:?}: {:#}", staging, e);
            }
        }
        Ok(())
    }
}

/// Relative path of an archive entry below the extraction root, or `None`
/// for entries that would escape it (absolute paths, `..`).
pub(crate) fn enclosed_path(entry_path: &Path) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for component in entry_path.components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if result.as_os_str().is_empty() {
        None
    } else {
        Some(result)
    }
}

/// True if `path`, or its nearest existing ancestor, resolves below `root`
/// once symlinks already on disk are followed. `root` must be canonical.
pub(crate) fn resolves_inside<R: Runtime>(runtime: &R, root: &Path, path: &Path) -> bool {
    let mut existing = path;
    while !runtime.exists(existing) && !runtime.is_symlink(existing) {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return false,
        }
    }
    // A dangling symlink fails to canonicalize and counts as outside.
    match runtime.canonicalize(existing) {
        Ok(resolved) => is_path_under(&resolved, root),
        Err(_) => false,
    }
}

/// True if a symlink at `link` pointing at `target` stays inside `root`,
/// following links already extracted. `root` must be canonical.
pub(crate) fn link_stays_inside<R: Runtime>(
    runtime: &R,
    root: &Path,
    link: &Path,
    target: &Path,
) -> bool {
    if target.is_absolute() {
        return false;
    }
    let parent = link.parent().unwrap_or(root);
    let base = runtime
        .canonicalize(parent)
        .unwrap_or_else(|_| parent.to_path_buf());
    let joined = base.join(target);
    let resolved = runtime.canonicalize(&joined).unwrap_or(joined);
    is_path_under(&resolved, root)
}
