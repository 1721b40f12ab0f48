//! Reload coordinator.
//!
//! Consumes the watcher's change stream, debounces it, classifies each
//! flushed burst and broadcasts the result. Runs inside the tokio runtime
//! thread next to nothing else; the HTTP worker pool never blocks on it.

use std::{sync::Arc, time::Duration};

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::{
    debounce::DebounceBuffer,
    hub::{BroadcastHub, ReloadClient},
    message::ReloadMessage,
};
use crate::{
    config::{ReloadConfig, WatchConfig},
    log,
    watcher::{self, ChangeEvent},
};

/// Upper bound on one select iteration, so shutdown is noticed promptly
/// even while the buffer is idle.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub struct Coordinator<C: ReloadClient> {
    buffer: DebounceBuffer,
    css_injection: bool,
    watch: WatchConfig,
    hub: Arc<BroadcastHub<C>>,
    events_rx: mpsc::Receiver<ChangeEvent>,
    shutdown_rx: Receiver<()>,
}

impl<C: ReloadClient> Coordinator<C> {
    pub fn new(
        reload: &ReloadConfig,
        watch: WatchConfig,
        hub: Arc<BroadcastHub<C>>,
        events_rx: mpsc::Receiver<ChangeEvent>,
        shutdown_rx: Receiver<()>,
    ) -> Self {
        Self {
            buffer: DebounceBuffer::new(reload.debounce()),
            css_injection: reload.css_injection,
            watch,
            hub,
            events_rx,
            shutdown_rx,
        }
    }

    /// Run until shutdown fires or the watcher side hangs up.
    pub async fn run(mut self) {
        loop {
            if self.shutdown_rx.try_recv().is_ok() {
                break;
            }

            tokio::select! {
                biased;
                event = self.events_rx.recv() => match event {
                    // Events can also arrive from outside the watcher,
                    // so the ignore policy is enforced here as well
                    Some(event) if !watcher::should_ignore(&event.path, &self.watch) => {
                        self.buffer.add(event);
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = tokio::time::sleep(self.buffer.sleep_duration().min(SHUTDOWN_POLL)) => {
                    self.flush_if_ready();
                }
            }
        }

        // Clean close tells clients not to reconnect
        self.hub.close_all();
    }

    fn flush_if_ready(&mut self) {
        let Some(changes) = self.buffer.take_if_ready() else {
            return;
        };

        let msg = ReloadMessage::classify(changes.keys().map(|p| p.as_path()), self.css_injection);
        log!("reload"; "{} change(s), broadcasting {}", changes.len(), msg);
        self.hub.broadcast(msg);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use parking_lot::Mutex;

    use super::*;
    use crate::watcher::ChangeKind;

    /// In-memory client whose deliveries stay observable after the
    /// coordinator takes ownership of the hub.
    #[derive(Clone, Default)]
    struct RecordingClient {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ReloadClient for RecordingClient {
        fn send_text(&mut self, text: &str) -> anyhow::Result<()> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }

        fn close(&mut self) {}
    }

    type TestCoordinator = Coordinator<RecordingClient>;

    fn coordinator(
        debounce_ms: u64,
    ) -> (
        TestCoordinator,
        Arc<BroadcastHub<RecordingClient>>,
        mpsc::Sender<ChangeEvent>,
        crossbeam::channel::Sender<()>,
    ) {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
        let reload = ReloadConfig { debounce_ms, ..ReloadConfig::default() };
        let hub = Arc::new(BroadcastHub::new());
        let coordinator = Coordinator::new(
            &reload,
            WatchConfig::default(),
            Arc::clone(&hub),
            events_rx,
            shutdown_rx,
        );
        (coordinator, hub, events_tx, shutdown_tx)
    }

    fn event(path: &str, kind: ChangeKind) -> ChangeEvent {
        ChangeEvent { path: PathBuf::from(path), kind }
    }

    #[tokio::test]
    async fn test_coordinator_stops_on_shutdown() {
        let (coordinator, _hub, _events_tx, shutdown_tx) = coordinator(10);
        shutdown_tx.send(()).unwrap();
        // Must return rather than hang
        tokio::time::timeout(Duration::from_secs(1), coordinator.run())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_coordinator_stops_when_watcher_hangs_up() {
        let (coordinator, _hub, events_tx, _shutdown_tx) = coordinator(10);
        drop(events_tx);
        tokio::time::timeout(Duration::from_secs(1), coordinator.run())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_events_buffered_then_flushed() {
        let (mut coordinator, _hub, _events_tx, _shutdown_tx) = coordinator(0);
        coordinator.buffer.add(event("style.css", ChangeKind::Modified));

        // Zero debounce window: the burst is ready immediately
        coordinator.flush_if_ready();
        assert!(coordinator.buffer.take_if_ready().is_none());
    }

    #[tokio::test]
    async fn test_css_only_save_delivers_one_refreshcss() {
        let (coordinator, hub, events_tx, shutdown_tx) = coordinator(50);
        let sent = Arc::new(Mutex::new(Vec::new()));
        hub.register(RecordingClient { sent: Arc::clone(&sent) });

        let task = tokio::spawn(coordinator.run());
        events_tx
            .send(event("site/style.css", ChangeKind::Modified))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(*sent.lock(), vec!["refreshcss".to_string()]);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_html_save_in_same_window_upgrades_to_reload() {
        let (coordinator, hub, events_tx, shutdown_tx) = coordinator(50);
        let sent = Arc::new(Mutex::new(Vec::new()));
        hub.register(RecordingClient { sent: Arc::clone(&sent) });

        let task = tokio::spawn(coordinator.run());
        events_tx
            .send(event("site/style.css", ChangeKind::Modified))
            .await
            .unwrap();
        events_tx
            .send(event("site/index.html", ChangeKind::Modified))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        // The mixed burst settles as a single full reload
        assert_eq!(*sent.lock(), vec!["reload".to_string()]);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_ignored_paths_never_trigger_broadcast() {
        let (coordinator, hub, events_tx, shutdown_tx) = coordinator(50);
        let sent = Arc::new(Mutex::new(Vec::new()));
        hub.register(RecordingClient { sent: Arc::clone(&sent) });

        let task = tokio::spawn(coordinator.run());
        events_tx
            .send(event("site/node_modules/lib.js", ChangeKind::Modified))
            .await
            .unwrap();
        events_tx
            .send(event("site/index.html.swp", ChangeKind::Modified))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(sent.lock().is_empty());

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
