//! Removal of transient store entries when an operation is interrupted.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Tracks `.part` files and staging directories that must not outlive an
/// interrupted operation.
#[derive(Default)]
pub struct CleanupContext {
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete every registered path, ignoring failures.
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Cleaning up: {:?}", path);
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

/// A poisoned lock still holds a usable path list.
fn lock(ctx: &SharedCleanupContext) -> MutexGuard<'_, CleanupContext> {
    ctx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps `path` registered until [`CleanupGuard::success`] is called.
///
/// Dropping the guard without calling `success` leaves the path registered,
/// which is what an interrupted operation needs.
pub struct CleanupGuard {
    ctx: SharedCleanupContext,
    path: PathBuf,
}

impl CleanupGuard {
    pub fn new(ctx: SharedCleanupContext, path: PathBuf) -> Self {
        lock(&ctx).add(path.clone());
        Self { ctx, path }
    }

    /// The path is finished (renamed into place or already removed).
    pub fn success(self) {
        lock(&self.ctx).remove(&self.path);
    }
}

/// Install a Ctrl-C handler that removes every registered path and exits
/// with status 130. Abort the returned handle once the guarded work is done.
pub fn spawn_interrupt_handler(ctx: SharedCleanupContext) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cleaning up...");
            lock(&ctx).cleanup();
            std::process::exit(130);
        }
    })
}
