//! Package records: the durable `<name>-<version>.pv` entries in the store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::descriptor::PackageDescriptor;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::store::{RECORD_EXTENSION, Store, transient_sibling, validate_component};

/// Everything known about one published package-version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub maintainer: String,
    pub description: String,
    pub raw_link: String,
    pub section: String,
    #[serde(rename = "source_file")]
    pub artifact_path: PathBuf,
}

impl PackageRecord {
    pub fn from_descriptor(descriptor: &PackageDescriptor, artifact_path: PathBuf) -> Self {
        Self {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            maintainer: descriptor.maintainer.clone(),
            description: descriptor.description.clone(),
            raw_link: descriptor.source_url.clone(),
            section: descriptor.section.clone(),
            artifact_path,
        }
    }

    pub fn identity(&self) -> String {
        Store::identity(&self.name, &self.version)
    }

    /// The publish request this record was created from.
    pub fn descriptor(&self) -> PackageDescriptor {
        PackageDescriptor {
            name: self.name.clone(),
            version: self.version.clone(),
            maintainer: self.maintainer.clone(),
            description: self.description.clone(),
            source_url: self.raw_link.clone(),
            section: self.section.clone(),
        }
    }
}

/// Reads and writes package records under the store root.
pub struct MetadataStore<'a, R: Runtime> {
    runtime: &'a R,
    store: &'a Store,
}

impl<'a, R: Runtime> MetadataStore<'a, R> {
    pub fn new(runtime: &'a R, store: &'a Store) -> Self {
        Self { runtime, store }
    }

    /// Path of the record named `record_name`, which may be given with or
    /// without the `.pv` suffix.
    pub fn path_for(&self, record_name: &str) -> Result<PathBuf> {
        validate_component("package record", record_name)?;
        let identity = record_name
            .strip_suffix(&format!(".{}", RECORD_EXTENSION))
            .unwrap_or(record_name);
        validate_component("package record", identity)?;
        Ok(self.store.record_path(identity))
    }

    /// Load the record stored at `path`.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, path: &Path) -> Result<PackageRecord> {
        if !self.runtime.exists(path) {
            return Err(Error::NotFound {
                what: "package record",
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            });
        }

        let record_error = |source: anyhow::Error| Error::Record {
            action: "read",
            path: path.to_path_buf(),
            source,
        };
        let content = self.runtime.read_to_string(path).map_err(record_error)?;
        serde_json::from_str(&content).map_err(|e| record_error(e.into()))
    }

    /// Write `record` to `<identity>.pv`, replacing any previous record with the
    /// same identity. The content goes to a hidden temp file first and is then
    /// renamed into place, so readers see either the old or the new record.
    #[tracing::instrument(skip(self, record), fields(identity = %record.identity()))]
    pub fn save(&self, record: &PackageRecord) -> Result<PathBuf> {
        let path = self.store.record_path(&record.identity());
        let tmp_path = transient_sibling(&path, "tmp");
        let record_error = |source: anyhow::Error| Error::Record {
            action: "write",
            path: path.clone(),
            source,
        };

        let content = serde_json::to_string_pretty(record).map_err(|e| record_error(e.into()))?;
        if let Err(e) = self.runtime.write(&tmp_path, content.as_bytes()) {
            let _ = self.runtime.remove_file(&tmp_path);
            return Err(record_error(e));
        }
        if let Err(e) = self.runtime.rename(&tmp_path, &path) {
            let _ = self.runtime.remove_file(&tmp_path);
            return Err(record_error(e));
        }

        log::debug!("Saved package record {:?}", path);
        Ok(path)
    }
}
