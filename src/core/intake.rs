use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
    time::SystemTime,
};

use anyhow::Context;
use time::{Duration, OffsetDateTime};
use tracing::debug;

/// Saved uploads are named `image_<something>`; nothing else in the inbox counts.
pub const IMAGE_PREFIX: &str = "image_";

/// Minimum spacing between two extraction runs for the same sender.
pub const DEFAULT_TRIGGER_WINDOW: Duration = Duration::seconds(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeStatus {
    /// The two most recent images, newest first.
    Ready([PathBuf; 2]),
    /// Fewer than two images have arrived.
    Waiting { found: usize },
}

/// Pick the two most recently modified `image_*` files in `dir`.
pub fn latest_image_pair<P: AsRef<Path>>(dir: P) -> anyhow::Result<IntakeStatus> {
    let dir = dir.as_ref();
    let mut images: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read inbox {:?}", dir))? {
        let entry = entry?;
        let is_image = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with(IMAGE_PREFIX))
            .unwrap_or(false);
        if !is_image || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .with_context(|| format!("No modification time for {:?}", entry.path()))?;
        images.push((modified, entry.path()));
    }

    // Newest first; the path breaks ties so the order is stable.
    images.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    debug!(count = images.len(), ?dir, "inbox scanned");

    let mut newest = images.into_iter().map(|(_, path)| path);
    match (newest.next(), newest.next()) {
        (Some(first), Some(second)) => Ok(IntakeStatus::Ready([first, second])),
        (Some(_), None) => Ok(IntakeStatus::Waiting { found: 1 }),
        _ => Ok(IntakeStatus::Waiting { found: 0 }),
    }
}

/// Suppresses repeated triggers from the same sender inside a time window.
#[derive(Debug)]
pub struct TriggerGuard {
    window: Duration,
    last_trigger: Mutex<HashMap<String, OffsetDateTime>>,
}

impl Default for TriggerGuard {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_WINDOW)
    }
}

impl TriggerGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_trigger: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an earlier trigger, e.g. the newest stored record for `sender`.
    pub fn seed(&self, sender: &str, at: OffsetDateTime) {
        let mut last = self.last_trigger.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = last.entry(sender.to_string()).or_insert(at);
        if at > *entry {
            *entry = at;
        }
    }

    /// `false` when `sender` already triggered less than the window ago;
    /// otherwise `now` becomes their latest trigger.
    pub fn try_acquire(&self, sender: &str, now: OffsetDateTime) -> bool {
        let mut last = self.last_trigger.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = last.get(sender) {
            if now - *previous < self.window {
                debug!(sender, "trigger suppressed");
                return false;
            }
        }
        last.insert(sender.to_string(), now);
        true
    }
}
