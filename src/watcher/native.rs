//! Native watch strategy backed by OS notifications.

use std::{
    path::PathBuf,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::Receiver;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::{ChangeEvent, ChangeKind, should_ignore};
use crate::{config::WatchConfig, debug, error::WatchError, log, utils::fs::normalize_path};

/// Subscribe to every target directory and spawn the forwarding thread.
///
/// Targets are registered non-recursively; subdirectories appear in the
/// target list already, and new ones are attached as their create events
/// arrive (while the ceiling allows).
pub(super) fn spawn(
    targets: Vec<PathBuf>,
    watch: WatchConfig,
    ceiling: usize,
    tx: mpsc::Sender<ChangeEvent>,
    shutdown_rx: Receiver<()>,
) -> Result<JoinHandle<()>, WatchError> {
    // notify delivers on its own thread via a sync channel
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })?;

    let mut watched = 0usize;
    for target in &targets {
        watcher.watch(target, RecursiveMode::NonRecursive)?;
        watched += 1;
    }
    debug!("watch"; "native: {} directories registered", watched);

    Ok(thread::spawn(move || {
        // Keeps the watcher alive for the lifetime of the loop.
        run_loop(watcher, watched, ceiling, notify_rx, watch, tx, shutdown_rx);
    }))
}

fn run_loop(
    mut watcher: RecommendedWatcher,
    mut watched: usize,
    ceiling: usize,
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    watch: WatchConfig,
    tx: mpsc::Sender<ChangeEvent>,
    shutdown_rx: Receiver<()>,
) {
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let result = match notify_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(result) => result,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        let event = match result {
            Ok(event) => event,
            Err(e) => {
                log!("watch"; "notify error: {}", e);
                continue;
            }
        };

        let Some(kind) = map_kind(&event.kind) else {
            continue;
        };

        for path in &event.paths {
            if should_ignore(path, &watch) {
                continue;
            }

            let path = normalize_path(path);

            // Attach newly created directories so changes inside them are
            // seen too. Past the ceiling they are silently unwatched; the
            // polling fallback at startup covers trees that big.
            if kind == ChangeKind::Created && path.is_dir() && watched < ceiling {
                if watcher.watch(&path, RecursiveMode::NonRecursive).is_ok() {
                    watched += 1;
                    debug!("watch"; "attached new directory: {}", path.display());
                }
            }

            debug!("watch"; "event {}: {}", kind.label(), path.display());
            if tx.blocking_send(ChangeEvent { path, kind }).is_err() {
                return;
            }
        }
    }
}

/// Map a notify event kind onto ours, dropping noise.
fn map_kind(kind: &notify::EventKind) -> Option<ChangeKind> {
    use notify::EventKind;
    use notify::event::ModifyKind;

    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        // mtime/atime/chmod noise would cause reload loops
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use notify::{
        EventKind,
        event::{DataChange, MetadataKind, ModifyKind, RenameMode},
    };

    use super::*;

    #[test]
    fn test_map_kind_filters_metadata() {
        assert_eq!(
            map_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
            None
        );
        assert_eq!(
            map_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            map_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Any))),
            Some(ChangeKind::Renamed)
        );
        assert_eq!(map_kind(&EventKind::Access(notify::event::AccessKind::Any)), None);
    }
}
