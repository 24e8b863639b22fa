//! The package store handle and its naming conventions.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<name>-<version>.<ext>   fetched archive
//! <root>/<name>-<version>.pv      package record
//! <root>/<name>-<version>/        extracted package
//! <root>/.<entry>.<suffix>        transient (download, temp write, staging)
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::runtime::Runtime;

/// Extension of package record files.
pub const RECORD_EXTENSION: &str = "pv";

/// Explicit handle on the package store root; components never look the
/// location up on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<name>-<version>`, shared by the archive, record and package directory.
    pub fn identity(name: &str, version: &str) -> String {
        format!("{}-{}", name, version)
    }

    /// Returns: `<root>/<identity>.<extension>`
    pub fn archive_path(&self, identity: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", identity, extension))
    }

    /// Returns: `<root>/<identity>.pv`
    pub fn record_path(&self, identity: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", identity, RECORD_EXTENSION))
    }

    /// Returns: `<root>/<identity>`
    pub fn package_dir(&self, identity: &str) -> PathBuf {
        self.root.join(identity)
    }

    /// Create the store root if it is missing.
    #[tracing::instrument(skip(self, runtime))]
    pub fn ensure<R: Runtime>(&self, runtime: &R) -> Result<()> {
        if !runtime.is_dir(&self.root) {
            runtime.create_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// True for dot-prefixed transient entries.
    pub fn is_transient(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
    }
}

/// Hidden sibling used while `path` is being produced:
/// `/store/foo-1.0.pv` + `tmp` gives `/store/.foo-1.0.pv.tmp`.
pub(crate) fn transient_sibling(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}", file_name, suffix))
}

/// The identity a link target stands for: a record file `<identity>.pv` or a
/// package directory `<identity>`.
pub fn identity_of_target(target: &Path) -> Option<String> {
    let file_name = target.file_name()?.to_str()?;
    let identity = file_name
        .strip_suffix(&format!(".{}", RECORD_EXTENSION))
        .unwrap_or(file_name);
    if identity.is_empty() {
        None
    } else {
        Some(identity.to_string())
    }
}

/// Check that `value` can be used as a single path component in the store or
/// link directory.
pub fn validate_component(what: &'static str, value: &str) -> Result<(), Error> {
    let invalid = |reason| Error::InvalidName {
        what,
        name: value.to_string(),
        reason,
    };

    if value.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.trim() != value {
        return Err(invalid("must not have leading or trailing whitespace"));
    }
    if value.starts_with('.') {
        return Err(invalid("must not start with '.'"));
    }
    if value.contains(['/', '\\']) {
        return Err(invalid("must not contain path separators"));
    }
    if value.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    Ok(())
}
