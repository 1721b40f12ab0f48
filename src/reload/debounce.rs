//! Pure debouncer: only handles timing and event deduplication.
//! No broadcast logic, no global state access.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::debug;
use crate::watcher::{ChangeEvent, ChangeKind};

/// Buffers change events until a quiet window has passed.
///
/// Idle while `changes` is empty; buffering once the first event arrives;
/// a flush hands the whole burst to the caller and returns to idle. The
/// window restarts on every event, so a burst is delivered as one unit.
pub struct DebounceBuffer {
    window: Duration,
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<std::path::PathBuf, ChangeKind>,
    last_event: Option<Instant>,
}

impl DebounceBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    /// Add an event, applying dedup rules:
    /// - Removed + Created/Modified → use the restore event
    /// - Created/Modified + Removed → Removed wins (Created+Removed cancels)
    /// - Same kind: first event wins
    pub fn add(&mut self, event: ChangeEvent) {
        let ChangeEvent { path, kind } = event;

        if let Some(&existing) = self.changes.get(&path) {
            match (existing, kind) {
                (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                    debug!("reload"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                    self.changes.insert(path, kind);
                }
                (ChangeKind::Modified | ChangeKind::Renamed, ChangeKind::Removed) => {
                    debug!("reload"; "upgrade {}->removed: {}", existing.label(), path.display());
                    self.changes.insert(path, ChangeKind::Removed);
                }
                (ChangeKind::Created, ChangeKind::Removed) => {
                    // Appeared then vanished within the window, nothing to tell clients
                    debug!("reload"; "discard created+removed: {}", path.display());
                    self.changes.remove(&path);
                }
                _ => {}
            }
        } else {
            self.changes.insert(path, kind);
        }

        self.last_event = Some(Instant::now());
    }

    /// Take the buffered burst if the quiet window has elapsed.
    pub fn take_if_ready(&mut self) -> Option<FxHashMap<std::path::PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }

        self.last_event = None;
        let changes = std::mem::take(&mut self.changes);
        (!changes.is_empty()).then_some(changes)
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        last_event.elapsed() >= self.window && !self.changes.is_empty()
    }

    /// Precise sleep duration until the next possible flush time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}
