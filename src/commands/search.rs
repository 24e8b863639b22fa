use anyhow::Result;

use crate::cleanup;
use crate::runtime::Runtime;

use super::config::Config;
use super::{open_lifecycle, print_package_details, state_label};

/// Show the details of every active package whose name contains `term`.
#[tracing::instrument(skip(runtime, config))]
pub fn search<R: Runtime>(runtime: R, term: &str, config: Config) -> Result<()> {
    let store = config.store();
    let lifecycle = open_lifecycle(&runtime, &store, &config, cleanup::new_shared())?;

    let hits = lifecycle.search(term);
    if hits.is_empty() {
        println!("No packages found for '{}'.", term);
        return Ok(());
    }

    println!("Found {} package(s) matching '{}':", hits.len(), term);
    println!("{}", "-".repeat(40));
    for hit in &hits {
        print_package_details(hit);
    }
    Ok(())
}

/// One line per active package.
#[tracing::instrument(skip(runtime, config))]
pub fn list<R: Runtime>(runtime: R, config: Config) -> Result<()> {
    let store = config.store();
    let lifecycle = open_lifecycle(&runtime, &store, &config, cleanup::new_shared())?;

    let hits = lifecycle.list();
    if hits.is_empty() {
        println!("No packages active.");
        return Ok(());
    }
    for hit in hits {
        println!(
            "{} {} ({})",
            hit.record.name,
            hit.record.version,
            state_label(hit.state)
        );
    }
    Ok(())
}
