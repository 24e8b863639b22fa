use anyhow::Result;
use std::sync::Arc;

use crate::cleanup::{self, spawn_interrupt_handler};
use crate::lifecycle::Upgraded;
use crate::runtime::Runtime;

use super::config::Config;
use super::open_lifecycle;

/// Reinstall the active package for `name` from its record.
#[tracing::instrument(skip(runtime, config))]
pub async fn upgrade<R: Runtime>(runtime: R, name: &str, config: Config) -> Result<()> {
    let store = config.store();
    let cleanup_ctx = cleanup::new_shared();
    let lifecycle = open_lifecycle(&runtime, &store, &config, Arc::clone(&cleanup_ctx))?;

    let ctrl_c_handler = spawn_interrupt_handler(cleanup_ctx);
    let result = lifecycle.upgrade(name);
    ctrl_c_handler.abort();

    match result? {
        Upgraded::Reinstalled(installed) => println!(
            "Upgraded {} {} in {}",
            installed.record.name,
            installed.record.version,
            installed.package_dir.display()
        ),
        Upgraded::NotActive => println!("Package {} is not installed.", name),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_upgrade_inactive_package_is_a_no_op() {
        let dir = tempdir().unwrap();
        let config = Config::for_test(dir.path());

        upgrade(RealRuntime, "foo", config.clone()).await.unwrap();
        assert_eq!(std::fs::read_dir(&config.store_root).unwrap().count(), 0);
    }
}
