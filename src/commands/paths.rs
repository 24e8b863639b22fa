use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Directory holding the package store and the activation links.
#[tracing::instrument(skip(runtime))]
pub fn default_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if runtime.is_privileged() {
        Ok(system_root())
    } else {
        let home_dir = runtime
            .home_dir()
            .context("Could not find home directory")?;
        Ok(home_dir.join(".pvp"))
    }
}

/// Returns: `<root>/packages`
pub fn default_store_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    Ok(default_root(runtime)?.join("packages"))
}

/// Returns: `<root>/active`
pub fn default_link_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    Ok(default_root(runtime)?.join("active"))
}

#[cfg(target_os = "macos")]
fn system_root() -> PathBuf {
    PathBuf::from("/opt/pvp")
}

#[cfg(target_os = "windows")]
fn system_root() -> PathBuf {
    PathBuf::from(r"C:\ProgramData\pvp")
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn system_root() -> PathBuf {
    PathBuf::from("/usr/local/lib/pvp")
}
