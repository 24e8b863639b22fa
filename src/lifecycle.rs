//! The package lifecycle: publish, install, uninstall, upgrade and search.
//!
//! ```text
//! publish    fetch archive -> write <identity>.pv -> link name -> record
//! install    read record -> extract <identity>/ -> link name -> directory
//! uninstall  resolve link -> remove link -> delete <identity>/
//! upgrade    capture identity -> uninstall -> install <identity>.pv
//! ```
//!
//! Each step only starts once the previous one succeeded. Records and
//! archives are never deleted; uninstall only removes the link and the
//! extracted directory.

use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::archive::ArchiveExtractorImpl;
use crate::cleanup::SharedCleanupContext;
use crate::descriptor::PackageDescriptor;
use crate::download::fetch_archive;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::link::LinkManager;
use crate::record::{MetadataStore, PackageRecord};
use crate::runtime::{Runtime, is_path_under};
use crate::store::{RECORD_EXTENSION, Store, identity_of_target, validate_component};

#[derive(Debug)]
pub struct Published {
    pub record: PackageRecord,
    pub record_path: PathBuf,
    pub link: PathBuf,
    /// The archive was already in the store.
    pub archive_reused: bool,
    /// The record from an earlier publish of this identity was kept as is.
    pub record_kept: bool,
    /// What the link pointed at before, if it was replaced.
    pub replaced: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Installed {
    pub record: PackageRecord,
    pub package_dir: PathBuf,
    pub link: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Uninstalled {
    Removed {
        name: String,
        /// The extracted directory that was deleted, if there was one.
        package_dir: Option<PathBuf>,
    },
    /// No activation link exists for the name.
    NotFound,
}

#[derive(Debug)]
pub enum Upgraded {
    Reinstalled(Installed),
    /// No activation link exists for the name.
    NotActive,
}

/// What an activation link currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// The record file: published but not extracted.
    Published,
    /// The extracted package directory.
    Installed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub record: PackageRecord,
    pub target: PathBuf,
    pub state: ActivationState,
}

pub struct Lifecycle<'a, R: Runtime> {
    runtime: &'a R,
    store: &'a Store,
    links: LinkManager<'a, R>,
    extractor: ArchiveExtractorImpl,
    http_client: HttpClient,
    cleanup: SharedCleanupContext,
}

impl<'a, R: Runtime> Lifecycle<'a, R> {
    pub fn new(
        runtime: &'a R,
        store: &'a Store,
        links: LinkManager<'a, R>,
        http_client: HttpClient,
        cleanup: SharedCleanupContext,
    ) -> Self {
        Self {
            runtime,
            store,
            links,
            extractor: ArchiveExtractorImpl::new(),
            http_client,
            cleanup,
        }
    }

    pub fn links(&self) -> &LinkManager<'a, R> {
        &self.links
    }

    fn records(&self) -> MetadataStore<'a, R> {
        MetadataStore::new(self.runtime, self.store)
    }

    /// Fetch the archive, record the package and point its link at the record.
    #[tracing::instrument(skip(self, descriptor), fields(name = %descriptor.name, version = %descriptor.version))]
    pub async fn publish(&self, descriptor: &PackageDescriptor) -> Result<Published> {
        validate_component("package name", &descriptor.name)?;
        validate_component("package version", &descriptor.version)?;
        let identity = Store::identity(&descriptor.name, &descriptor.version);

        let fetched = fetch_archive(
            self.runtime,
            self.store,
            &self.http_client,
            &self.cleanup,
            &descriptor.source_url,
            &identity,
        )
        .await?;

        let requested = PackageRecord::from_descriptor(descriptor, fetched.path);
        let (record, record_path, record_kept) = self.record_for(requested, fetched.reused)?;

        let replaced = self
            .links
            .resolve(&descriptor.name)
            .filter(|previous| previous != &record_path);
        if let Some(previous) = &replaced
            && self.runtime.is_dir(previous)
        {
            warn!(
                "{} was installed from {:?}; its link now points at the new record",
                descriptor.name, previous
            );
        }
        let link = self.links.activate(&descriptor.name, &record_path)?;

        info!("Published {} as {:?}", identity, record_path);
        Ok(Published {
            record,
            record_path,
            link,
            archive_reused: fetched.reused,
            record_kept,
            replaced,
        })
    }

    /// A record is never rewritten while the archive it describes stays in
    /// place; a changed config for the same identity only gets a warning.
    fn record_for(
        &self,
        requested: PackageRecord,
        archive_reused: bool,
    ) -> Result<(PackageRecord, PathBuf, bool)> {
        let records = self.records();
        let record_path = self.store.record_path(&requested.identity());

        if archive_reused && self.runtime.exists(&record_path) {
            match records.load(&record_path) {
                Ok(existing) => {
                    if existing != requested {
                        warn!(
                            "{} is already published from {}; keeping that record. \
                             Publish a new version to change it.",
                            existing.identity(),
                            existing.raw_link
                        );
                    }
                    return Ok((existing, record_path, true));
                }
                Err(e) => warn!("Rewriting unreadable record {:?}: {}", record_path, e),
            }
        }

        let record_path = records.save(&requested)?;
        Ok((requested, record_path, false))
    }

    /// Extract the archive of a published record and point the link at the
    /// extracted directory. `record_name` may omit the `.pv` suffix.
    #[tracing::instrument(skip(self))]
    pub fn install(&self, record_name: &str) -> Result<Installed> {
        let records = self.records();
        let record_path = records.path_for(record_name)?;
        let record = records.load(&record_path)?;
        let package_dir = self.store.package_dir(&record.identity());

        self.extractor.extract_into(
            self.runtime,
            &record.artifact_path,
            &package_dir,
            &self.cleanup,
        )?;

        let link = match self.links.activate(&record.name, &package_dir) {
            Ok(link) => link,
            Err(e) => {
                // Without a link the directory is unreachable; go back to the
                // recorded state so a retry can extract again.
                if let Err(remove_err) = self.runtime.remove_dir_all(&package_dir) {
                    warn!(
                        "Failed to remove {:?} after activation failed: {:#}",
                        package_dir, remove_err
                    );
                }
                return Err(e);
            }
        };

        info!("Installed {} into {:?}", record.identity(), package_dir);
        Ok(Installed {
            record,
            package_dir,
            link,
        })
    }

    /// Remove the link for `name` and delete the extracted directory behind it.
    ///
    /// The link is removed first. If deleting the directory fails afterwards the
    /// package is already inactive and [`Error::RemoveFiles`] is returned.
    #[tracing::instrument(skip(self))]
    pub fn uninstall(&self, name: &str) -> Result<Uninstalled> {
        validate_component("package name", name)?;
        let Some(target) = self.links.resolve(name) else {
            debug!("No activation link for {}", name);
            return Ok(Uninstalled::NotFound);
        };
        let identity = identity_of_target(&target);

        self.links.deactivate(name)?;

        let package_dir = identity
            .map(|identity| self.store.package_dir(&identity))
            .filter(|dir| self.is_removable_package_dir(dir));
        if let Some(dir) = &package_dir {
            self.runtime
                .remove_dir_all(dir)
                .map_err(|source| Error::RemoveFiles {
                    name: name.to_string(),
                    path: dir.clone(),
                    source,
                })?;
            debug!("Removed {:?}", dir);
        }

        info!("Uninstalled {}", name);
        Ok(Uninstalled::Removed {
            name: name.to_string(),
            package_dir,
        })
    }

    fn is_removable_package_dir(&self, dir: &Path) -> bool {
        self.runtime.is_dir(dir)
            && !self.runtime.is_symlink(dir)
            && dir != self.store.root()
            && is_path_under(dir, self.store.root())
    }

    /// Reinstall the currently active package from its record.
    ///
    /// This is not atomic: once the old installation is removed, a failing
    /// install leaves the package uninstalled and is reported as
    /// [`Error::UpgradeIncomplete`].
    #[tracing::instrument(skip(self))]
    pub fn upgrade(&self, name: &str) -> Result<Upgraded> {
        validate_component("package name", name)?;
        let Some(target) = self.links.resolve(name) else {
            return Ok(Upgraded::NotActive);
        };

        let identity = identity_of_target(&target).ok_or_else(|| Error::NotFound {
            what: "package record for",
            name: target.display().to_string(),
        })?;
        let record_name = format!("{}.{}", identity, RECORD_EXTENSION);
        let records = self.records();
        records.load(&records.path_for(&record_name)?)?;

        self.uninstall(name)?;

        match self.install(&record_name) {
            Ok(installed) => Ok(Upgraded::Reinstalled(installed)),
            Err(e) => Err(Error::UpgradeIncomplete {
                name: name.to_string(),
                record: record_name,
                source: Box::new(e),
            }),
        }
    }

    /// Active packages whose name contains `term`, ignoring case, sorted by
    /// name. Links whose record cannot be read are skipped.
    #[tracing::instrument(skip(self))]
    pub fn search(&self, term: &str) -> Vec<SearchHit> {
        let term = term.to_lowercase();
        let records = self.records();

        let mut hits: Vec<SearchHit> = self
            .links
            .list_active()
            .filter(|(name, _)| name.to_lowercase().contains(&term))
            .filter_map(|(name, target)| {
                let identity = identity_of_target(&target)?;
                match records.load(&self.store.record_path(&identity)) {
                    Ok(record) => {
                        let state = if self.runtime.is_dir(&target) {
                            ActivationState::Installed
                        } else {
                            ActivationState::Published
                        };
                        Some(SearchHit {
                            record,
                            target,
                            state,
                        })
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", name, e);
                        None
                    }
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.record
                .name
                .cmp(&b.record.name)
                .then_with(|| a.record.version.cmp(&b.record.version))
        });
        hits
    }

    /// All active packages.
    pub fn list(&self) -> Vec<SearchHit> {
        self.search("")
    }
}
