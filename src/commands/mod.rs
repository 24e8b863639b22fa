//! Command implementations behind the `pvp` subcommands.
//!
//! Each command prepares the store and link directories, runs one lifecycle
//! operation and prints its outcome. Errors are returned to `main`, which
//! prints the chain and exits non-zero.

use anyhow::Result;

use crate::cleanup::SharedCleanupContext;
use crate::http::HttpClient;
use crate::lifecycle::{ActivationState, Lifecycle, SearchHit};
use crate::link::LinkManager;
use crate::runtime::Runtime;
use crate::store::Store;

pub mod config;
mod install;
mod paths;
mod publish;
mod search;
mod uninstall;
mod upgrade;

pub use config::Config;
pub use install::install;
pub use publish::publish;
pub use search::{list, search};
pub use uninstall::uninstall;
pub use upgrade::upgrade;

fn open_lifecycle<'a, R: Runtime>(
    runtime: &'a R,
    store: &'a Store,
    config: &Config,
    cleanup_ctx: SharedCleanupContext,
) -> Result<Lifecycle<'a, R>> {
    config.ensure_dirs(runtime)?;
    let links = LinkManager::new(runtime, &config.link_dir, config.link_style);
    let http_client = HttpClient::with_user_agent(env!("PVP_VERSION"))?;
    Ok(Lifecycle::new(runtime, store, links, http_client, cleanup_ctx))
}

fn state_label(state: ActivationState) -> &'static str {
    match state {
        ActivationState::Published => "published",
        ActivationState::Installed => "installed",
    }
}

pub(crate) fn print_package_details(hit: &SearchHit) {
    let record = &hit.record;
    println!("Name: {}", record.name);
    println!("Version: {}", record.version);
    println!("Maintainer: {}", record.maintainer);
    println!("Description: {}", record.description);
    println!("Raw Link: {}", record.raw_link);
    println!("Section: {}", record.section);
    println!("Status: {} ({})", state_label(hit.state), hit.target.display());
    println!("{}", "-".repeat(40));
}
