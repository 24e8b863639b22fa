//! Package config documents and the descriptor parsed from them.
//!
//! A config names the six fields of a publish request:
//!
//! ```toml
//! Name = "foo"
//! Version = "1.0"
//! Maintainer = "Jane Doe <jane@example.com>"
//! Description = "Foo utilities"
//! RawLink = "https://example.com/foo-1.0.tar.gz"
//! Section = "utils"
//! ```
//!
//! The same keys are accepted as child elements of an XML document, which is
//! the format of configs written for earlier pvp releases:
//!
//! ```xml
//! <Package>
//!   <Name>foo</Name>
//!   <Version>1.0</Version>
//!   ...
//! </Package>
//! ```
//!
//! and in a JSON object when the file ends in `.json`.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::store::validate_component;

/// A validated publish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    pub maintainer: String,
    pub description: String,
    pub source_url: String,
    pub section: String,
}

/// Syntax of a config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Xml,
}

impl ConfigFormat {
    /// JSON for `*.json`, XML for `*.xml`, TOML for everything else.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            Some(ext) if ext.eq_ignore_ascii_case("xml") => ConfigFormat::Xml,
            _ => ConfigFormat::Toml,
        }
    }

    /// Like [`ConfigFormat::from_path`], but a document without a known
    /// extension that starts with `<` is read as XML.
    pub fn detect(path: &Path, text: &str) -> Self {
        match Self::from_path(path) {
            ConfigFormat::Toml if text.trim_start().starts_with('<') => ConfigFormat::Xml,
            format => format,
        }
    }
}

/// Every field is optional here so a missing or null value is reported by
/// name instead of as a generic deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    name: Option<String>,
    version: Option<String>,
    maintainer: Option<String>,
    description: Option<String>,
    raw_link: Option<String>,
    section: Option<String>,
}

impl TryFrom<RawConfig> for PackageDescriptor {
    type Error = Error;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let name = required("Name", raw.name)?;
        let version = required("Version", raw.version)?;
        let maintainer = required("Maintainer", raw.maintainer)?;
        let description = required("Description", raw.description)?;
        let source_url = required("RawLink", raw.raw_link)?;
        let section = required("Section", raw.section)?;

        validate_component("package name", &name).map_err(config_error)?;
        validate_component("package version", &version).map_err(config_error)?;
        if source_url.trim().is_empty() {
            return Err(Error::Config {
                reason: "field 'RawLink' must not be empty".into(),
            });
        }

        Ok(PackageDescriptor {
            name,
            version,
            maintainer,
            description,
            source_url: source_url.trim().to_string(),
            section,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| Error::Config {
        reason: format!("missing required field '{}'", field),
    })
}

fn config_error(err: Error) -> Error {
    Error::Config {
        reason: err.to_string(),
    }
}

/// Parse a config document.
pub fn parse(text: &str, format: ConfigFormat) -> Result<PackageDescriptor> {
    let raw: RawConfig = match format {
        ConfigFormat::Toml => toml::from_str(text).map_err(|e| Error::Config {
            reason: e.message().to_string(),
        })?,
        ConfigFormat::Json => serde_json::from_str(text).map_err(|e| Error::Config {
            reason: e.to_string(),
        })?,
        ConfigFormat::Xml => quick_xml::de::from_str(text).map_err(|e| Error::Config {
            reason: e.to_string(),
        })?,
    };
    raw.try_into()
}

/// Read and parse the config document at `path`.
#[tracing::instrument(skip(runtime))]
pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<PackageDescriptor> {
    if !runtime.exists(path) {
        return Err(Error::Config {
            reason: format!("config file {} not found", path.display()),
        });
    }
    let text = runtime.read_to_string(path).map_err(|e| Error::Config {
        reason: format!("{:#}", e),
    })?;
    parse(&text, ConfigFormat::detect(path, &text))
}
