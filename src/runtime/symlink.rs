//! Activation link primitives and symlink-aware path resolution.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;
use super::path::normalize_path;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn symlink_impl(&self, original: &Path, link: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::symlink as unix_symlink;
            unix_symlink(original, link)
                .with_context(|| format!("Failed to create symlink {:?}", link))?;
        }
        #[cfg(windows)]
        {
            use anyhow::bail;
            use std::os::windows::fs::{symlink_dir, symlink_file};
            use tracing::trace;

            // `is_dir()` on a relative path is relative to CWD; we want it relative to the link's parent.
            let target_path = if original.is_absolute() {
                original.to_path_buf()
            } else {
                link.parent()
                    .context("Failed to get parent directory for symlink")?
                    .join(original)
            };

            if target_path.is_dir() {
                trace!("{} is a directory, creating directory symlink", target_path.display());
                symlink_dir(original, link).context("Failed to create directory symlink")?;
            } else {
                trace!("{} is a file, creating file symlink", target_path.display());
                symlink_file(original, link).context("Failed to create file symlink")?;
            }

            if fs::symlink_metadata(link).is_err() {
                bail!(
                    "Symlink creation reported success but link does not exist: link={:?} target={:?}",
                    link,
                    original
                );
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_link_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::read_link(path).with_context(|| format!("Failed to read symlink {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn resolve_link_impl(&self, path: &Path) -> Result<PathBuf> {
        let target = self.read_link_impl(path)?;
        if target.is_absolute() {
            Ok(target)
        } else {
            let parent = path
                .parent()
                .context("Failed to get parent directory of symlink")?;
            Ok(normalize_path(&parent.join(&target)))
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_symlink_impl(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn canonicalize_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("Failed to resolve {:?}", path))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_symlink_impl(&self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            fs::remove_file(path).with_context(|| format!("Failed to remove symlink {:?}", path))?;
        }
        #[cfg(windows)]
        {
            // Directory symlinks need remove_dir, file symlinks need remove_file.
            fs::remove_dir(path)
                .or_else(|_| fs::remove_file(path))
                .with_context(|| format!("Failed to remove symlink {:?}", path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use tempfile::tempdir;

    #[cfg_attr(
        pvp_skip_cross_windows_tests,
        ignore = "cross windows tests disabled; set PVP_RUN_CROSS_WINDOWS_TESTS=1 to enable"
    )]
    #[test]
    fn test_real_runtime_symlink_to_directory() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let target = dir.path().join("foo-1.0");
        runtime.create_dir_all(&target).unwrap();

        let link = dir.path().join("foo");
        runtime.symlink(&target, &link).unwrap();
        assert!(runtime.is_symlink(&link));
        assert!(!runtime.is_symlink(&target));
        assert_eq!(runtime.resolve_link(&link).unwrap(), target);

        runtime.remove_symlink(&link).unwrap();
        assert!(!runtime.exists(&link));
        assert!(runtime.is_dir(&target));
    }

    #[cfg_attr(
        pvp_skip_cross_windows_tests,
        ignore = "cross windows tests disabled; set PVP_RUN_CROSS_WINDOWS_TESTS=1 to enable"
    )]
    #[test]
    fn test_real_runtime_symlink_to_file_reads_through() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let target = dir.path().join("foo-1.0.pv");
        runtime.write(&target, b"{\"name\":\"foo\"}").unwrap();

        let link = dir.path().join("foo");
        runtime.symlink(&target, &link).unwrap();

        assert_eq!(runtime.read_to_string(&link).unwrap(), "{\"name\":\"foo\"}");
        runtime.remove_symlink(&link).unwrap();
    }

    #[cfg_attr(
        pvp_skip_cross_windows_tests,
        ignore = "cross windows tests disabled; set PVP_RUN_CROSS_WINDOWS_TESTS=1 to enable"
    )]
    #[test]
    fn test_is_symlink_true_for_dangling_link() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let link = dir.path().join("gone");
        runtime
            .symlink(&dir.path().join("missing-1.0"), &link)
            .unwrap();

        assert!(runtime.is_symlink(&link));
        assert!(!runtime.exists(&link));
        runtime.remove_symlink(&link).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_link_relative_target_parent_dir() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let target = dir.path().join("store").join("foo-1.0.pv");
        runtime.create_dir_all(target.parent().unwrap()).unwrap();
        runtime.write(&target, b"{}").unwrap();

        let links = dir.path().join("active");
        runtime.create_dir_all(&links).unwrap();
        let link = links.join("foo");
        std::os::unix::fs::symlink(std::path::Path::new("../store/foo-1.0.pv"), &link).unwrap();

        let resolved = runtime.resolve_link(&link).unwrap();
        assert_eq!(resolved, target);
    }

    #[cfg(unix)]
    #[test]
    fn test_canonicalize_follows_link_out_of_directory() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let staging = dir.path().join("packages/.foo-1.0.extract");
        runtime.create_dir_all(&staging).unwrap();
        std::os::unix::fs::symlink("..", staging.join("up")).unwrap();

        let resolved = runtime.canonicalize(&staging.join("up")).unwrap();
        assert_eq!(
            resolved,
            runtime.canonicalize(&dir.path().join("packages")).unwrap()
        );
        assert!(runtime.canonicalize(&staging.join("missing")).is_err());
    }

    #[test]
    fn test_read_link_on_regular_file_fails() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain");
        runtime.write(&file, b"x").unwrap();

        assert!(!runtime.is_symlink(&file));
        assert!(runtime.read_link(&file).is_err());
    }
}
