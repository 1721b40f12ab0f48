//! Polling watch strategy.
//!
//! Scans the root trees on an interval and diffs (mtime, size) snapshots.
//! Slower to notice changes than native events but works everywhere,
//! including mounts where inotify never fires.

use std::{
    path::PathBuf,
    thread::{self, JoinHandle},
    time::SystemTime,
};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use jwalk::WalkDir;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::{ChangeEvent, ChangeKind, should_ignore};
use crate::{config::WatchConfig, debug};

/// Per-file fingerprint. Equal fingerprints mean "unchanged".
type Snapshot = FxHashMap<PathBuf, (SystemTime, u64)>;

pub(super) fn spawn(
    roots: Vec<PathBuf>,
    watch: WatchConfig,
    tx: mpsc::Sender<ChangeEvent>,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let interval = watch.poll_interval_duration();
        let mut snapshot = scan(&roots, &watch);
        debug!("watch"; "polling: {} files in initial scan", snapshot.len());

        loop {
            // Interruptible sleep: shutdown wakes us immediately.
            match shutdown_rx.recv_timeout(interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            let current = scan(&roots, &watch);
            for event in diff(&snapshot, &current) {
                debug!("watch"; "event {}: {}", event.kind.label(), event.path.display());
                if tx.blocking_send(event).is_err() {
                    return;
                }
            }
            snapshot = current;
        }
    })
}

/// Walk all roots and fingerprint every non-ignored file.
fn scan(roots: &[PathBuf], watch: &WatchConfig) -> Snapshot {
    let mut snapshot = Snapshot::default();

    for root in roots {
        let walker = {
            let watch = watch.clone();
            WalkDir::new(root)
                .skip_hidden(false)
                .process_read_dir(move |_, _, _, children| {
                    children.retain(|entry| {
                        entry.as_ref().is_ok_and(|e| {
                            !e.file_type().is_dir()
                                || !watch.is_ignored_dir(&e.file_name().to_string_lossy())
                        })
                    });
                })
        };

        for entry in walker.into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if should_ignore(&path, watch) {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                snapshot.insert(path, (mtime, meta.len()));
            }
        }
    }

    snapshot
}

/// Compare two snapshots and emit the changes between them.
fn diff(before: &Snapshot, after: &Snapshot) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (path, fingerprint) in after {
        match before.get(path) {
            None => events.push(ChangeEvent {
                path: path.clone(),
                kind: ChangeKind::Created,
            }),
            Some(old) if old != fingerprint => events.push(ChangeEvent {
                path: path.clone(),
                kind: ChangeKind::Modified,
            }),
            Some(_) => {}
        }
    }

    for path in before.keys() {
        if !after.contains_key(path) {
            events.push(ChangeEvent {
                path: path.clone(),
                kind: ChangeKind::Removed,
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn fingerprints(pairs: &[(&str, u64)]) -> Snapshot {
        pairs
            .iter()
            .map(|(p, len)| (PathBuf::from(p), (SystemTime::UNIX_EPOCH, *len)))
            .collect()
    }

    #[test]
    fn test_diff_detects_create_modify_remove() {
        let before = fingerprints(&[("a.html", 10), ("b.css", 20)]);
        let after = fingerprints(&[("a.html", 11), ("c.js", 5)]);

        let events = diff(&before, &after);
        let kind_of = |p: &str| {
            events
                .iter()
                .find(|e| e.path == PathBuf::from(p))
                .map(|e| e.kind)
        };

        assert_eq!(kind_of("a.html"), Some(ChangeKind::Modified));
        assert_eq!(kind_of("b.css"), Some(ChangeKind::Removed));
        assert_eq!(kind_of("c.js"), Some(ChangeKind::Created));
    }

    #[test]
    fn test_diff_identical_snapshots_is_empty() {
        let snap = fingerprints(&[("a.html", 10)]);
        assert!(diff(&snap, &snap.clone()).is_empty());
    }

    #[test]
    fn test_scan_skips_ignored_and_temp() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "hi").unwrap();
        fs::write(dir.path().join("draft.swp"), "x").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/lib.js"), "x").unwrap();

        let watch = WatchConfig::default();
        let snapshot = scan(&[dir.path().to_path_buf()], &watch);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.keys().next().unwrap().ends_with("index.html"));
    }
}
