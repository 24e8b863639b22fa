use anyhow::Result;
use log::debug;
use std::path::Path;
use std::sync::Arc;

use crate::cleanup::{self, spawn_interrupt_handler};
use crate::descriptor;
use crate::runtime::Runtime;

use super::config::Config;
use super::open_lifecycle;

/// Publish the package described by the config file at `package_config`.
#[tracing::instrument(skip(runtime, config))]
pub async fn publish<R: Runtime>(runtime: R, package_config: &Path, config: Config) -> Result<()> {
    let descriptor = descriptor::load(&runtime, package_config)?;
    debug!("Publishing {:?}", descriptor);

    let store = config.store();
    let cleanup_ctx = cleanup::new_shared();
    let lifecycle = open_lifecycle(&runtime, &store, &config, Arc::clone(&cleanup_ctx))?;

    let ctrl_c_handler = spawn_interrupt_handler(cleanup_ctx);
    let result = lifecycle.publish(&descriptor).await;
    ctrl_c_handler.abort();
    let published = result?;

    if published.archive_reused {
        println!(
            "Archive {} already in store, not downloaded again.",
            published.record.artifact_path.display()
        );
    }
    if published.record_kept {
        println!(
            "Record {} already exists and was kept.",
            published.record_path.display()
        );
    }
    println!(
        "Published {} {} to {}",
        published.record.name,
        published.record.version,
        published.record_path.display()
    );
    if let Some(previous) = &published.replaced {
        println!("Replaced previous activation {}", previous.display());
    }
    println!(
        "Linked {} -> {}",
        published.link.display(),
        published.record_path.display()
    );
    Ok(())
}
