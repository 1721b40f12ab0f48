//! File watching strategies.
//!
//! Two interchangeable strategies feed the same change channel:
//!
//! - `native` - OS notifications via notify (inotify, FSEvents, kqueue)
//! - `polling` - periodic mtime/size scans for environments where native
//!   events never arrive (network mounts, container volumes)
//!
//! Strategy selection happens once at startup. Native is preferred, but the
//! session falls back to polling when `force_polling` is set, when the root
//! trees exceed the watch-target ceiling, or when the native subscription
//! fails outright.

mod native;
mod polling;

use std::{
    path::{Path, PathBuf},
    thread::JoinHandle,
};

use crossbeam::channel::Receiver;
use jwalk::WalkDir;
use tokio::sync::mpsc;

use crate::{config::Config, log};

/// Kind of filesystem change, after notify noise is filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Renamed => "renamed",
        }
    }
}

/// A single filesystem change, already filtered and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Which strategy ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Native,
    Polling,
}

/// Running watcher thread. Dropping the shutdown sender (or sending on it)
/// stops the thread; `join` waits for it.
pub struct WatcherHandle {
    pub strategy: Strategy,
    thread: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) {
        let _ = self.thread.join();
    }
}

/// Start watching the configured roots, picking a strategy.
///
/// Events are pushed into `tx`; the thread stops when `shutdown_rx` fires
/// or every receiver of `tx` is gone.
pub fn spawn(
    config: &Config,
    tx: mpsc::Sender<ChangeEvent>,
    shutdown_rx: Receiver<()>,
) -> WatcherHandle {
    let roots = config.roots.clone();
    let watch = config.watch.clone();

    if watch.force_polling {
        log!("watch"; "polling every {:.1}s (forced)", watch.poll_interval);
        return spawn_polling(roots, watch, tx, shutdown_rx);
    }

    let ceiling = watch.max_targets_clamped();
    let targets = collect_targets(&roots, &watch, ceiling);

    let Some(targets) = targets else {
        log!(
            "watch";
            "more than {} directories to watch, falling back to polling",
            ceiling
        );
        return spawn_polling(roots, watch, tx, shutdown_rx);
    };

    match native::spawn(targets, watch.clone(), ceiling, tx.clone(), shutdown_rx.clone()) {
        Ok(thread) => {
            log!("watch"; "watching {} for changes", roots_summary(&roots));
            WatcherHandle { strategy: Strategy::Native, thread }
        }
        Err(e) => {
            log!("watch"; "native watch unavailable ({}), falling back to polling", e);
            spawn_polling(roots, watch, tx, shutdown_rx)
        }
    }
}

fn spawn_polling(
    roots: Vec<PathBuf>,
    watch: crate::config::WatchConfig,
    tx: mpsc::Sender<ChangeEvent>,
    shutdown_rx: Receiver<()>,
) -> WatcherHandle {
    let thread = polling::spawn(roots, watch, tx, shutdown_rx);
    WatcherHandle { strategy: Strategy::Polling, thread }
}

fn roots_summary(roots: &[PathBuf]) -> String {
    roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collect the directories to register with the native watcher.
///
/// Walks each root, skipping ignored directories. Returns `None`
/// as soon as the ceiling is exceeded so the caller can fall back to polling
/// instead of watching a truncated subset.
fn collect_targets(
    roots: &[PathBuf],
    watch: &crate::config::WatchConfig,
    ceiling: usize,
) -> Option<Vec<PathBuf>> {
    let mut targets = Vec::new();

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
            if !entry.file_type().is_dir() {
                continue;
            }
            if targets.len() >= ceiling {
                return None;
            }
            targets.push(entry.path());
        }
    }

    Some(targets)
}

/// Check whether a changed path is excluded from reload handling.
pub fn should_ignore(path: &Path, watch: &crate::config::WatchConfig) -> bool {
    if is_temp_file(path) {
        return true;
    }

    if path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|name| watch.is_ignored_dir(name))
    {
        return true;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| watch.is_ignored_extension(ext))
}

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::WatchConfig;

    #[test]
    fn test_temp_file_detection() {
        assert!(is_temp_file(Path::new("index.html.swp")));
        assert!(is_temp_file(Path::new("notes.bak")));
        assert!(is_temp_file(Path::new("draft.html~")));
        assert!(is_temp_file(Path::new(".index.html.kate-swp")));
        assert!(!is_temp_file(Path::new("index.html")));
        assert!(!is_temp_file(Path::new("style.css")));
    }

    #[test]
    fn test_should_ignore_dirs_and_extensions() {
        let mut watch = WatchConfig::default();
        watch.ignored_extensions.push("log".into());

        assert!(should_ignore(Path::new("site/node_modules/lib/index.js"), &watch));
        assert!(should_ignore(Path::new("site/.git/HEAD"), &watch));
        assert!(should_ignore(Path::new("site/server.log"), &watch));
        assert!(!should_ignore(Path::new("site/index.html"), &watch));
    }

    #[test]
    fn test_collect_targets_skips_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/sub")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();

        let watch = WatchConfig::default();
        let targets = collect_targets(&[dir.path().to_path_buf()], &watch, 50).unwrap();

        assert!(targets.iter().any(|t| t.ends_with("src/sub")));
        assert!(!targets.iter().any(|t| {
            t.components().any(|c| c.as_os_str() == "node_modules")
        }));
    }

    #[test]
    fn test_collect_targets_overflow_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..12 {
            fs::create_dir(dir.path().join(format!("d{i}"))).unwrap();
        }

        let watch = WatchConfig::default();
        assert!(collect_targets(&[dir.path().to_path_buf()], &watch, 10).is_none());
    }
}
