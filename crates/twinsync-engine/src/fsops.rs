//! Copy and remove primitives
//!
//! Every function here reports success as a `bool` and logs the outcome
//! instead of returning an error: an I/O failure leaves both sides unchanged
//! and a later event or reconciliation pass naturally retries. Copies
//! preserve the source mtime so the newer-wins comparison stays meaningful
//! after propagation.

use filetime::FileTime;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, error, info};

/// Copy a file, creating the destination's parent directories and
/// overwriting any existing destination
pub async fn copy_file(source: &Path, dest: &Path) -> bool {
    if let Some(parent) = dest.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(
                "Failed to create directory '{}': {}",
                parent.display(),
                e
            );
            return false;
        }
    }

    match fs::copy(source, dest).await {
        Ok(bytes) => {
            if let Some(modified) = mtime(source).await {
                if let Err(e) =
                    filetime::set_file_mtime(dest, FileTime::from_system_time(modified))
                {
                    debug!(
                        "Could not preserve mtime on '{}': {}",
                        dest.display(),
                        e
                    );
                }
            }
            info!(
                "Copied: {} -> {} ({} bytes)",
                source.display(),
                dest.display(),
                bytes
            );
            true
        }
        Err(e) => {
            error!(
                "Failed to copy '{}' to '{}': {}",
                source.display(),
                dest.display(),
                e
            );
            false
        }
    }
}

/// Remove a file or directory tree; `false` when the path does not exist
pub async fn remove_path(path: &Path) -> bool {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(md) => md,
        Err(_) => return false,
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Ok(()) => {
            info!("Removed: {}", path.display());
            true
        }
        Err(e) => {
            error!("Failed to remove '{}': {}", path.display(), e);
            false
        }
    }
}

/// Create a directory and its parents if missing
pub async fn ensure_dir(path: &Path) -> bool {
    match fs::create_dir_all(path).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to create directory '{}': {}", path.display(), e);
            false
        }
    }
}

/// Modification time of a path, `None` when unavailable
pub async fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).await.ok()?.modified().ok()
}
