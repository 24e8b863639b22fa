use anyhow::Result;
use log::debug;

use crate::cleanup;
use crate::lifecycle::Uninstalled;
use crate::runtime::Runtime;

use super::config::Config;
use super::open_lifecycle;

/// Deactivate a package and delete its extracted files.
///
/// Uninstalling a name that has no activation link is not an error.
#[tracing::instrument(skip(runtime, config))]
pub fn uninstall<R: Runtime>(runtime: R, name: &str, config: Config) -> Result<()> {
    let store = config.store();
    let lifecycle = open_lifecycle(&runtime, &store, &config, cleanup::new_shared())?;

    match lifecycle.uninstall(name)? {
        Uninstalled::Removed { name, package_dir } => {
            match package_dir {
                Some(dir) => println!("Uninstalled {} (removed {})", name, dir.display()),
                None => println!("Uninstalled {}", name),
            }
        }
        Uninstalled::NotFound => {
            debug!("Nothing to uninstall for {}", name);
            println!("Package {} is not installed.", name);
        }
    }
    Ok(())
}
