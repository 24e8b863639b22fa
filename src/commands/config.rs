use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::link::LinkStyle;
use crate::runtime::Runtime;
use crate::store::Store;

use super::paths::{default_link_dir, default_store_root};

/// Locations shared by all commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_root: PathBuf,
    pub link_dir: PathBuf,
    pub link_style: LinkStyle,
}

impl Config {
    /// Use the given locations, falling back to the defaults for the current
    /// user.
    pub fn load<R: Runtime>(
        runtime: &R,
        store_root: Option<PathBuf>,
        link_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let store_root = match store_root {
            Some(path) => path,
            None => default_store_root(runtime)?,
        };
        let link_dir = match link_dir {
            Some(path) => path,
            None => default_link_dir(runtime)?,
        };
        debug!("Using store {:?} and link directory {:?}", store_root, link_dir);

        Ok(Self {
            store_root,
            link_dir,
            link_style: LinkStyle::native(),
        })
    }

    pub fn store(&self) -> Store {
        Store::new(&self.store_root)
    }

    /// Create the store and link directories if they are missing.
    pub fn ensure_dirs<R: Runtime>(&self, runtime: &R) -> Result<()> {
        self.store()
            .ensure(runtime)
            .with_context(|| format!("Failed to prepare package store {:?}", self.store_root))?;
        if !runtime.is_dir(&self.link_dir) {
            runtime
                .create_dir_all(&self.link_dir)
                .with_context(|| format!("Failed to prepare link directory {:?}", self.link_dir))?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_test(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            store_root: root.join("packages"),
            link_dir: root.join("active"),
            link_style: if cfg!(pvp_skip_cross_windows_tests) {
                LinkStyle::PointerFile
            } else {
                LinkStyle::native()
            },
        }
    }
}
