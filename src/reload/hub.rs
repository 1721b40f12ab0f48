//! Client registry and broadcast.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;

use super::message::ReloadMessage;
use crate::debug;

/// One connected reload client.
///
/// The trait seam lets the hub be exercised with in-memory clients; the
/// real implementation wraps a server-side WebSocket.
pub trait ReloadClient: Send {
    fn send_text(&mut self, text: &str) -> anyhow::Result<()>;
    fn close(&mut self);
}

/// Fan-out point for reload notifications.
///
/// Clients register when their WebSocket upgrade completes and are dropped
/// the first time a send fails. One dead client never blocks delivery to
/// the rest.
pub struct BroadcastHub<C: ReloadClient> {
    clients: Arc<Mutex<Vec<(u64, C)>>>,
    next_id: AtomicU64,
}

impl<C: ReloadClient> Default for BroadcastHub<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ReloadClient> BroadcastHub<C> {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a client, returning its id for later unregistration.
    pub fn register(&self, client: C) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut clients = self.clients.lock();
        clients.push((id, client));
        debug!("reload"; "client {} connected ({} total)", id, clients.len());
        id
    }

    /// Remove a client by id. Unknown ids are a no-op, so double
    /// unregistration is harmless.
    pub fn unregister(&self, id: u64) {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain_mut(|(client_id, client)| {
            if *client_id == id {
                client.close();
                false
            } else {
                true
            }
        });
        if clients.len() < before {
            debug!("reload"; "client {} removed ({} remaining)", id, clients.len());
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send a message to every client, dropping those whose send fails.
    /// Returns the number of successful deliveries.
    pub fn broadcast(&self, msg: ReloadMessage) -> usize {
        let mut clients = self.clients.lock();

        if clients.is_empty() {
            debug!("reload"; "no clients connected");
            return 0;
        }

        let mut delivered = 0;
        clients.retain_mut(|(id, client)| match client.send_text(msg.as_str()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(e) => {
                debug!("reload"; "client {} dropped: {}", id, e);
                false
            }
        });

        debug!("reload"; "{} delivered to {} clients", msg, delivered);
        delivered
    }

    /// Close every connection. Used on shutdown; the clean close tells
    /// clients not to reconnect.
    pub fn close_all(&self) {
        let mut clients = self.clients.lock();
        for (_, client) in clients.iter_mut() {
            client.close();
        }
        clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeClient {
        failing: bool,
        sent: Vec<String>,
        closed: bool,
    }

    impl ReloadClient for FakeClient {
        fn send_text(&mut self, text: &str) -> anyhow::Result<()> {
            if self.failing {
                anyhow::bail!("connection reset");
            }
            self.sent.push(text.to_string());
            Ok(())
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[test]
    fn test_broadcast_reaches_all_clients() {
        let hub = BroadcastHub::new();
        hub.register(FakeClient::default());
        hub.register(FakeClient::default());

        assert_eq!(hub.broadcast(ReloadMessage::FullReload), 2);
        assert_eq!(hub.client_count(), 2);
    }

    #[test]
    fn test_failed_client_is_dropped_others_delivered() {
        let hub = BroadcastHub::new();
        hub.register(FakeClient::default());
        hub.register(FakeClient { failing: true, ..Default::default() });
        hub.register(FakeClient::default());

        assert_eq!(hub.broadcast(ReloadMessage::RefreshCss), 2);
        assert_eq!(hub.client_count(), 2);

        // Subsequent broadcasts see only the healthy set
        assert_eq!(hub.broadcast(ReloadMessage::FullReload), 2);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let hub = BroadcastHub::new();
        let id = hub.register(FakeClient::default());
        hub.register(FakeClient::default());

        hub.unregister(id);
        assert_eq!(hub.client_count(), 1);
        hub.unregister(id);
        assert_eq!(hub.client_count(), 1);
    }

    #[test]
    fn test_close_all_empties_registry() {
        let hub = BroadcastHub::new();
        hub.register(FakeClient::default());
        hub.register(FakeClient::default());

        hub.close_all();
        assert_eq!(hub.client_count(), 0);
        assert_eq!(hub.broadcast(ReloadMessage::FullReload), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let hub = BroadcastHub::new();
        let a = hub.register(FakeClient::default());
        let b = hub.register(FakeClient::default());
        assert_ne!(a, b);
    }
}
