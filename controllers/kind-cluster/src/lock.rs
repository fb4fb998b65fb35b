//! Stale kubeconfig lock recovery.
//!
//! kind takes `~/.kube/config.lock` while it merges a new context into the
//! user's kubeconfig. A crashed run leaves the lock behind and every later
//! run blocks on it, so a lock older than a minute is treated as abandoned.

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Lock file name inside the kube directory
pub const LOCK_FILE_NAME: &str = "config.lock";

/// Age after which a lock is considered abandoned
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(60);

/// Remove the lock in `kube_dir` if it is stale. Never fails.
pub fn recover_stale_lock(kube_dir: &Path) {
    let path = kube_dir.join(LOCK_FILE_NAME);
    remove_if_stale(&path, SystemTime::now());
}

/// Remove `path` if its modification time is strictly older than
/// [`STALE_LOCK_AGE`] at `now`. Returns whether the file was removed.
///
/// A missing file, an unreadable timestamp or a failed removal all leave the
/// file alone and are only logged.
pub fn remove_if_stale(path: &Path, now: SystemTime) -> bool {
    let modified = match std::fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => modified,
        Err(e) => {
            debug!("No kubeconfig lock to recover at {}: {}", path.display(), e);
            return false;
        }
    };

    // A timestamp in the future counts as fresh
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    if age <= STALE_LOCK_AGE {
        debug!("Kubeconfig lock {} is {:?} old, leaving it", path.display(), age);
        return false;
    }

    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed stale kubeconfig lock {} ({:?} old)", path.display(), age);
            true
        }
        Err(e) => {
            debug!("Failed to remove stale kubeconfig lock {}: {}", path.display(), e);
            false
        }
    }
}
