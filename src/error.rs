//! Error kinds surfaced by lifecycle operations.
//!
//! Low-level filesystem and transport failures are `anyhow::Error`s carrying
//! their own context; they are attached as the `source` of one of these
//! variants at the component boundary so callers can match on the kind.

use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The package config document is malformed or incomplete.
    #[error("invalid package config: {reason}")]
    Config { reason: String },

    /// A package or link name cannot be used as a path component.
    #[error("invalid {what} '{name}': {reason}")]
    InvalidName {
        what: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("failed to fetch {url} for {package}")]
    Fetch {
        package: String,
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported archive format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("package directory {} already exists; uninstall the package first", path.display())]
    AlreadyExtracted { path: PathBuf },

    #[error("failed to extract {}", archive.display())]
    Extract {
        archive: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("failed to {action} package record {}", path.display())]
    Record {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to {action} activation link for {name}")]
    Link {
        action: &'static str,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Uninstall removed the link but could not delete the package files.
    #[error(
        "{name} is no longer active, but its files at {} could not be removed",
        path.display()
    )]
    RemoveFiles {
        name: String,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Upgrade uninstalled the package and the reinstall failed.
    #[error(
        "upgrade of {name} failed after the old installation was removed; {name} is no longer installed (retry with `pvp install {record}`)"
    )]
    UpgradeIncomplete {
        name: String,
        record: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
