//! Activation links: one entry per package name in the link directory,
//! pointing at the package's record file or its extracted directory.
//!
//! Links are always written under a hidden temporary name and renamed over
//! the final name, so a reader sees either the previous target or the new
//! one.

use anyhow::anyhow;
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::store::{Store, transient_sibling, validate_component};

/// How an activation link is represented on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// A native symbolic link.
    Symlink,
    /// A regular file whose content is the target path, for platforms where
    /// creating symlinks needs extra privileges.
    PointerFile,
}

impl LinkStyle {
    pub fn native() -> Self {
        if cfg!(unix) {
            LinkStyle::Symlink
        } else {
            LinkStyle::PointerFile
        }
    }
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self::native()
    }
}

pub struct LinkManager<'a, R: Runtime> {
    runtime: &'a R,
    link_dir: PathBuf,
    style: LinkStyle,
}

impl<'a, R: Runtime> LinkManager<'a, R> {
    pub fn new(runtime: &'a R, link_dir: impl Into<PathBuf>, style: LinkStyle) -> Self {
        Self {
            runtime,
            link_dir: link_dir.into(),
            style,
        }
    }

    /// Returns: `<link_dir>/<name>`
    pub fn link_path(&self, name: &str) -> PathBuf {
        self.link_dir.join(name)
    }

    fn is_link(&self, path: &Path) -> bool {
        match self.style {
            LinkStyle::Symlink => self.runtime.is_symlink(path),
            LinkStyle::PointerFile => {
                self.runtime.exists(path)
                    && !self.runtime.is_dir(path)
                    && !self.runtime.is_symlink(path)
            }
        }
    }

    fn remove_link(&self, path: &Path) -> anyhow::Result<()> {
        match self.style {
            LinkStyle::Symlink => self.runtime.remove_symlink(path),
            LinkStyle::PointerFile => self.runtime.remove_file(path),
        }
    }

    fn write_link(&self, target: &Path, path: &Path) -> anyhow::Result<()> {
        match self.style {
            LinkStyle::Symlink => self.runtime.symlink(target, path),
            LinkStyle::PointerFile => {
                let target = target
                    .to_str()
                    .ok_or_else(|| anyhow!("link target {:?} is not valid UTF-8", target))?;
                self.runtime.write(path, target.as_bytes())
            }
        }
    }

    /// Point `name` at `target`, replacing any previous link for the name.
    #[tracing::instrument(skip(self))]
    pub fn activate(&self, name: &str, target: &Path) -> Result<PathBuf> {
        validate_component("package name", name)?;
        let link = self.link_path(name);
        let link_error = |source| Error::Link {
            action: "create",
            name: name.to_string(),
            source,
        };

        if !self.is_link(&link) && (self.runtime.exists(&link) || self.runtime.is_symlink(&link))
        {
            return Err(link_error(anyhow!(
                "{:?} exists and is not an activation link",
                link
            )));
        }

        let tmp = transient_sibling(&link, "tmp");
        if self.runtime.is_symlink(&tmp) || self.runtime.exists(&tmp) {
            debug!("Removing stale link {:?}", tmp);
            self.remove_link(&tmp).map_err(link_error)?;
        }

        self.write_link(target, &tmp).map_err(link_error)?;
        if let Err(e) = self.runtime.rename(&tmp, &link) {
            let _ = self.remove_link(&tmp);
            return Err(link_error(e));
        }

        debug!("Activated {:?} -> {:?}", link, target);
        Ok(link)
    }

    /// Remove the link for `name`. Returns false if there was none.
    #[tracing::instrument(skip(self))]
    pub fn deactivate(&self, name: &str) -> Result<bool> {
        validate_component("package name", name)?;
        let link = self.link_path(name);

        if !self.is_link(&link) {
            if self.runtime.exists(&link) {
                warn!("{:?} is not an activation link, leaving it alone", link);
            }
            return Ok(false);
        }

        self.remove_link(&link).map_err(|source| Error::Link {
            action: "remove",
            name: name.to_string(),
            source,
        })?;
        debug!("Deactivated {:?}", link);
        Ok(true)
    }

    /// Current target of `name`, if it has a link.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        validate_component("package name", name).ok()?;
        self.resolve_path(&self.link_path(name))
    }

    fn resolve_path(&self, link: &Path) -> Option<PathBuf> {
        if !self.is_link(link) {
            return None;
        }
        let target = match self.style {
            LinkStyle::Symlink => self.runtime.resolve_link(link),
            LinkStyle::PointerFile => self
                .runtime
                .read_to_string(link)
                .map(|content| PathBuf::from(content.trim_end_matches(['\r', '\n']))),
        };

        match target {
            Ok(target) if target.as_os_str().is_empty() => None,
            Ok(target) if target.is_relative() => Some(self.link_dir.join(target)),
            Ok(target) => Some(target),
            Err(e) => {
                debug!("Failed to resolve {:?}: {:#}", link, e);
                None
            }
        }
    }

    /// All activation links as `(name, target)` pairs.
    ///
    /// The directory listing is read when this is called; each target is
    /// resolved only when its item is requested. Call again for a fresh scan.
    pub fn list_active(&self) -> ActiveLinks<'_, 'a, R> {
        let entries = self.runtime.read_dir(&self.link_dir).unwrap_or_else(|e| {
            debug!("No activation links readable in {:?}: {:#}", self.link_dir, e);
            Vec::new()
        });
        ActiveLinks {
            manager: self,
            entries: entries.into_iter(),
        }
    }
}

/// Iterator returned by [`LinkManager::list_active`].
pub struct ActiveLinks<'m, 'a, R: Runtime> {
    manager: &'m LinkManager<'a, R>,
    entries: std::vec::IntoIter<PathBuf>,
}

impl<R: Runtime> Iterator for ActiveLinks<'_, '_, R> {
    type Item = (String, PathBuf);

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            if Store::is_transient(&entry) {
                continue;
            }
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(target) = self.manager.resolve_path(&entry) {
                return Some((name.to_string(), target));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entries.len()))
    }
}
