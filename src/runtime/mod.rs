//! The seam between pvp and the machine it runs on.
//!
//! The store, link directory and config loader never call `std::fs`
//! directly; they take a `Runtime` so lifecycle transitions can be replayed
//! against `MockRuntime`, including failures halfway through. Archive
//! extraction is the exception: tar entries are written by the `tar` crate
//! itself once the runtime has vetted their destination.
//!
//! - `fs`: records, archives, staging directories
//! - `symlink`: activation links and the checks around them
//! - `env`: where the default store lives for this user
//! - `path`: lexical containment checks for destructive operations

mod env;
mod fs;
pub mod path;
mod symlink;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use path::is_path_under;

/// Filesystem and environment access used by the package lifecycle.
///
/// Fallible operations return `anyhow` errors that already name the path;
/// components wrap them into [`crate::Error`] kinds at their boundary.
#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Store contents
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> Result<u64>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_symlink(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    /// Full paths of the entries in `path`, in no particular order.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    // Activation links
    fn symlink(&self, original: &Path, link: &Path) -> Result<()>;
    fn read_link(&self, path: &Path) -> Result<PathBuf>;

    /// Target of the link at `path`, one level deep. A relative target is
    /// taken relative to the directory holding the link.
    fn resolve_link(&self, path: &Path) -> Result<PathBuf>;

    /// True for a symlink itself, dangling or not.
    fn is_symlink(&self, path: &Path) -> bool;

    /// `path` with every symlink on disk followed; fails if it does not exist.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    // Archives and package directories
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;
    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn is_dir(&self, path: &Path) -> bool;

    /// Apply unix permission bits from an archive entry. No-op elsewhere.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    // Default locations
    fn home_dir(&self) -> Option<PathBuf>;

    /// Root or an elevated administrator: such users get the system-wide store.
    fn is_privileged(&self) -> bool;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_impl(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        self.copy_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn remove_symlink(&self, path: &Path) -> Result<()> {
        self.remove_symlink_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn symlink(&self, original: &Path, link: &Path) -> Result<()> {
        self.symlink_impl(original, link)
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        self.read_link_impl(path)
    }

    fn resolve_link(&self, path: &Path) -> Result<PathBuf> {
        self.resolve_link_impl(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.is_symlink_impl(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.canonicalize_impl(path)
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        self.create_file_impl(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>> {
        self.open_impl(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.remove_dir_all_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        self.set_permissions_impl(path, mode)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir_impl()
    }

    fn is_privileged(&self) -> bool {
        self.is_privileged_impl()
    }
}
