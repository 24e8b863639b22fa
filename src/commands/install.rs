use anyhow::Result;
use std::sync::Arc;

use crate::cleanup::{self, spawn_interrupt_handler};
use crate::runtime::Runtime;

use super::config::Config;
use super::open_lifecycle;

/// Extract a published package and make it the active one for its name.
#[tracing::instrument(skip(runtime, config))]
pub async fn install<R: Runtime>(runtime: R, record_name: &str, config: Config) -> Result<()> {
    let store = config.store();
    let cleanup_ctx = cleanup::new_shared();
    let lifecycle = open_lifecycle(&runtime, &store, &config, Arc::clone(&cleanup_ctx))?;

    let ctrl_c_handler = spawn_interrupt_handler(cleanup_ctx);
    let result = lifecycle.install(record_name);
    ctrl_c_handler.abort();
    let installed = result?;

    println!(
        "Installed {} {} into {}",
        installed.record.name,
        installed.record.version,
        installed.package_dir.display()
    );
    println!(
        "Linked {} -> {}",
        installed.link.display(),
        installed.package_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_archives;
    use crate::link::LinkManager;
    use crate::record::{MetadataStore, PackageRecord};
    use crate::runtime::RealRuntime;
    use std::fs;
    use tempfile::tempdir;

    fn seed_record(config: &Config) {
        let store = config.store();
        fs::create_dir_all(store.root()).unwrap();
        let archive = store.archive_path("foo-1.0", "tar.gz");
        test_archives::tar_gz(&archive, &[("foo-1.0/bin/foo", "#!/bin/sh\n")]).unwrap();
        let record = PackageRecord {
            name: "foo".into(),
            version: "1.0".into(),
            maintainer: "Jane".into(),
            description: "Foo".into(),
            raw_link: "https://example.com/foo-1.0.tar.gz".into(),
            section: "utils".into(),
            artifact_path: archive,
        };
        MetadataStore::new(&RealRuntime, &store).save(&record).unwrap();
    }

    #[tokio::test]
    async fn test_install_extracts_and_links() {
        let dir = tempdir().unwrap();
        let config = Config::for_test(dir.path());
        seed_record(&config);

        install(RealRuntime, "foo-1.0.pv", config.clone())
            .await
            .unwrap();

        let package_dir = config.store_root.join("foo-1.0");
        assert!(package_dir.join("bin/foo").is_file());
        let links = LinkManager::new(&RealRuntime, &config.link_dir, config.link_style);
        assert_eq!(links.resolve("foo"), Some(package_dir));
    }

    #[tokio::test]
    async fn test_install_unknown_record() {
        let dir = tempdir().unwrap();
        let config = Config::for_test(dir.path());

        let err = install(RealRuntime, "bar-2.0", config).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
