//! Per-evaluation browser profile directories.
//!
//! Every Chrome instance gets its own user-data directory so concurrent
//! evaluations never share cookies, cache or storage:
//! - Unique directories under a configurable base location
//! - Automatic removal when the profile is dropped
//! - Sweeping of stale profiles left behind by crashed runs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Distinguishes profiles created in the same millisecond by one process
static PROFILE_SEQ: AtomicU64 = AtomicU64::new(0);

/// An isolated browser profile directory
#[derive(Debug)]
pub struct BrowserProfile {
    /// Unique profile ID
    pub id: String,
    /// Root directory for this profile
    pub dir: PathBuf,
}

impl BrowserProfile {
    /// Create a profile with a unique ID under `base`
    pub fn new(base: impl AsRef<Path>) -> Self {
        let id = generate_profile_id();
        let dir = base.as_ref().join(&id);

        Self { id, dir }
    }

    /// Create the profile directory
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Remove the profile directory now
    pub fn cleanup(&self) -> std::io::Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

/// Generate a unique profile ID
fn generate_profile_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let pid = std::process::id();
    let seq = PROFILE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("profile_{}_{}_{}", timestamp, pid, seq)
}

/// Remove profile directories under `base` older than `max_age`
pub fn cleanup_stale_profiles(base: &Path, max_age: Duration) -> std::io::Result<usize> {
    if !base.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut cleaned = 0;

    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let path = entry.path();
        let is_profile = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with("profile_"))
            .unwrap_or(false);

        if !path.is_dir() || !is_profile {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if age.map(|age| age > max_age).unwrap_or(false) && fs::remove_dir_all(&path).is_ok() {
            debug!(path = %path.display(), "removed stale browser profile");
            cleaned += 1;
        }
    }

    Ok(cleaned)
}
