//! Development HTTP server with live reload.
//!
//! # Module Structure
//!
//! - `gate` - In-flight request limiting
//! - `resolve` - URL to filesystem path resolution across roots
//! - `response` - Response handlers (files, ranges, compression)
//! - `listing` - Directory listing pages
//! - `suggest` - 404 near-miss suggestions and error pages

mod gate;
mod listing;
mod resolve;
mod response;
mod suggest;

use resolve::Resolved;

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam::channel;
use parking_lot::Mutex;
use tiny_http::{Method, Request, Response, StatusCode};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    debug,
    error::ServerError,
    log,
    reload::{self, CLIENT_SCRIPT_PATH, Coordinator, Hub, WS_PATH},
    watcher::{self, ChangeEvent},
};

use gate::ConnectionGate;

/// A bound server, not yet serving requests.
///
/// Binding and running are split so callers can learn the actual address
/// (port 0 asks the OS for a free one) before the blocking request loop
/// starts.
pub struct LiveServer {
    http: Arc<tiny_http::Server>,
    addr: SocketAddr,
    config: Arc<Config>,
    hub: Arc<Hub>,
    gate: Arc<ConnectionGate>,
    stopping: Arc<AtomicBool>,
    shutdown_tx: channel::Sender<()>,
    shutdown_rx: channel::Receiver<()>,
    events_tx: mpsc::Sender<ChangeEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<ChangeEvent>>>,
}

impl LiveServer {
    /// Bind the configured interface and port.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        let requested = SocketAddr::new(config.http.host, config.http.port);
        let http = tiny_http::Server::http(requested)
            .map_err(|source| ServerError::Bind { addr: requested, source })?;

        // With port 0 the OS picked; report what was actually bound
        let addr = http.server_addr().to_ip().unwrap_or(requested);
        let (shutdown_tx, shutdown_rx) = channel::unbounded();
        let (events_tx, events_rx) = mpsc::channel(64);

        Ok(Self {
            http: Arc::new(http),
            addr,
            gate: Arc::new(ConnectionGate::new(config.connections.max_concurrent)),
            config: Arc::new(config),
            hub: Arc::new(Hub::new()),
            stopping: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    /// The address actually bound.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sender for externally produced change events. They pass through
    /// the same debounce and classification as watcher events.
    pub fn change_sender(&self) -> mpsc::Sender<ChangeEvent> {
        self.events_tx.clone()
    }

    /// Handle for stopping the server from another thread.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            http: Arc::clone(&self.http),
            shutdown_tx: self.shutdown_tx.clone(),
            stopping: Arc::clone(&self.stopping),
        }
    }

    /// Run the request loop (blocking) until [`ServerHandle::stop`] fires.
    pub fn run(&self) -> Result<()> {
        let reload_stack = self.spawn_reload_stack();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.connections.max_threads_clamped())
            .build()
            .expect("failed to create thread pool");

        log!("serve"; "http://{}", self.addr);

        for request in self.http.incoming_requests() {
            let ctx = RequestContext {
                config: Arc::clone(&self.config),
                hub: Arc::clone(&self.hub),
                gate: Arc::clone(&self.gate),
                stopping: Arc::clone(&self.stopping),
            };
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &ctx) {
                    log!("serve"; "request error: {e}");
                }
            });
        }

        // incoming_requests only ends after unblock(); drain background work
        if let Some(stack) = reload_stack {
            stack.join(self.config.connections.timeout());
        }
        debug!("serve"; "stopped");
        Ok(())
    }

    /// Start the watcher and coordinator, unless reload is disabled.
    fn spawn_reload_stack(&self) -> Option<ReloadStack> {
        if !self.config.reload.enabled {
            debug!("serve"; "live reload disabled");
            return None;
        }
        let events_rx = self.events_rx.lock().take()?;

        let watcher = watcher::spawn(&self.config, self.events_tx.clone(), self.shutdown_rx.clone());
        debug!("serve"; "watch strategy: {:?}", watcher.strategy);

        let hub = Arc::clone(&self.hub);
        let reload_cfg = self.config.reload.clone();
        let watch_cfg = self.config.watch.clone();
        let shutdown_rx = self.shutdown_rx.clone();
        let coordinator = thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("failed to create tokio runtime");
            rt.block_on(Coordinator::new(&reload_cfg, watch_cfg, hub, events_rx, shutdown_rx).run());
        });

        Some(ReloadStack { watcher, coordinator })
    }
}

struct ReloadStack {
    watcher: watcher::WatcherHandle,
    coordinator: JoinHandle<()>,
}

impl ReloadStack {
    /// Wait for the background loops, giving up after `timeout`.
    fn join(self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.watcher.is_finished() && self.coordinator.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }
        if self.watcher.is_finished() {
            self.watcher.join();
        }
        if self.coordinator.is_finished() {
            let _ = self.coordinator.join();
        }
    }
}

/// Cloneable stop control for a running [`LiveServer`].
#[derive(Clone)]
pub struct ServerHandle {
    http: Arc<tiny_http::Server>,
    shutdown_tx: channel::Sender<()>,
    stopping: Arc<AtomicBool>,
}

impl ServerHandle {
    /// Stop the server. Idempotent; later calls are no-ops.
    pub fn stop(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        // One wake per background loop (watcher, coordinator, slack)
        for _ in 0..4 {
            let _ = self.shutdown_tx.send(());
        }
        self.http.unblock();
    }
}

/// Everything a worker needs to answer one request.
struct RequestContext {
    config: Arc<Config>,
    hub: Arc<Hub>,
    gate: Arc<ConnectionGate>,
    stopping: Arc<AtomicBool>,
}

/// Handle a single HTTP request.
fn handle_request(request: Request, ctx: &RequestContext) -> Result<()> {
    if ctx.stopping.load(Ordering::SeqCst) {
        let response = Response::from_string("503 Service Unavailable")
            .with_status_code(StatusCode(503));
        return request.respond(response).map_err(Into::into);
    }

    let Some(_permit) = ctx.gate.try_acquire() else {
        debug!("serve"; "connection limit hit, rejecting {}", request.url());
        return response::respond_busy(request, &ctx.config);
    };

    if ctx.config.http.cors && request.method() == &Method::Options {
        return response::respond_preflight(request, &ctx.config);
    }

    let url_path = request
        .url()
        .split(['?', '#'])
        .next()
        .unwrap_or("/")
        .to_string();

    // Reserved paths are answered from memory before any root is consulted
    if ctx.config.reload.enabled {
        if url_path == WS_PATH {
            return reload::handle_upgrade(request, &ctx.hub);
        }
        if url_path == CLIENT_SCRIPT_PATH {
            return response::respond_client_script(request, &ctx.config);
        }
    }

    match resolve::resolve(&url_path, &ctx.config.roots) {
        Some(Resolved::File(path)) => {
            debug!("serve"; "{} -> {}", url_path, path.display());
            response::respond_file(request, &path, &ctx.config, ctx.config.reload.enabled)
        }
        Some(Resolved::Directory(dir)) => {
            // Listings need the trailing slash so relative links resolve
            if !url_path.ends_with('/') {
                let location = format!("{url_path}/");
                let response = Response::empty(StatusCode(301))
                    .with_header(tiny_http::Header::from_bytes("Location", location.as_bytes()).unwrap());
                return request.respond(response).map_err(Into::into);
            }
            response::respond_listing(request, &url_path, &dir, &ctx.config)
        }
        Some(Resolved::Forbidden) => {
            log!("serve"; "rejected traversal attempt: {}", url_path);
            response::respond_forbidden(request, &ctx.config)
        }
        None => {
            debug!("serve"; "not found: {}", url_path);
            response::respond_not_found(request, &ctx.config)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{Read, Write},
        net::TcpStream,
        time::Duration,
    };

    use super::*;

    fn test_config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.roots = vec![root.to_path_buf()];
        config.http.port = 0;
        config.reload.enabled = false;
        config
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        write!(stream, "GET {path} HTTP/1.0\r\nHost: localhost\r\n\r\n").unwrap();
        let mut buf = String::new();
        let _ = stream.read_to_string(&mut buf);
        buf
    }

    fn spawn_server(config: Config) -> (SocketAddr, ServerHandle, thread::JoinHandle<()>) {
        let server = LiveServer::bind(config).unwrap();
        let addr = server.addr();
        let handle = server.handle();
        let thread = thread::spawn(move || {
            let _ = server.run();
        });
        (addr, handle, thread)
    }

    #[test]
    fn test_port_zero_reports_real_port() {
        let dir = tempfile::tempdir().unwrap();
        let server = LiveServer::bind(test_config(dir.path())).unwrap();
        assert_ne!(server.addr().port(), 0);
    }

    #[test]
    fn test_double_bind_same_port_fails() {
        let dir = tempfile::tempdir().unwrap();
        let first = LiveServer::bind(test_config(dir.path())).unwrap();

        let mut config = test_config(dir.path());
        config.http.port = first.addr().port();
        let err = match LiveServer::bind(config) {
            Ok(_) => panic!("second bind on an occupied port must fail"),
            Err(e) => e,
        };
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[test]
    fn test_serves_file_and_404() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<body>hello</body>").unwrap();

        let (addr, handle, thread) = spawn_server(test_config(dir.path()));

        let response = get(addr, "/index.html");
        assert!(response.starts_with("HTTP/1.0 200") || response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("hello"));

        let response = get(addr, "/missing.html");
        assert!(response.contains("404"));

        handle.stop();
        handle.stop();
        thread.join().unwrap();
    }

    #[test]
    fn test_traversal_gets_403() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "x").unwrap();

        let (addr, handle, thread) = spawn_server(test_config(dir.path()));
        let response = get(addr, "/../../etc/passwd");
        assert!(response.contains("403"));

        handle.stop();
        thread.join().unwrap();
    }

    #[test]
    fn test_connection_limit_returns_busy_page() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "x").unwrap();

        let mut config = test_config(dir.path());
        config.connections.max_concurrent = 0;

        let (addr, handle, thread) = spawn_server(config);
        let response = get(addr, "/index.html");
        assert!(response.contains("503"));

        handle.stop();
        thread.join().unwrap();
    }

    #[test]
    fn test_directory_listing_and_redirect() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/readme.txt"), "r").unwrap();

        let (addr, handle, thread) = spawn_server(test_config(dir.path()));

        let response = get(addr, "/docs");
        assert!(response.contains("301"));
        assert!(response.contains("Location: /docs/"));

        let response = get(addr, "/docs/");
        assert!(response.contains("readme.txt"));

        handle.stop();
        thread.join().unwrap();
    }

    #[test]
    fn test_websocket_upgrade_and_reload_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<body>x</body>").unwrap();

        let mut config = test_config(dir.path());
        config.reload.enabled = true;
        config.watch.force_polling = true;
        config.watch.poll_interval = 0.2;
        config.reload.debounce_ms = 50;

        let (addr, handle, thread) = spawn_server(config);

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        write!(
            stream,
            "GET /livereload HTTP/1.1\r\nHost: localhost\r\n\
             Connection: Upgrade\r\nUpgrade: websocket\r\n\
             Sec-WebSocket-Version: 13\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
        )
        .unwrap();

        // Give the poller its first snapshot, then make a change
        thread::sleep(Duration::from_millis(500));
        fs::write(dir.path().join("page.html"), "y").unwrap();

        // Expect the 101 handshake followed by a "reload" text frame
        let mut buf = Vec::new();
        let mut chunk = [0u8; 256];
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while std::time::Instant::now() < deadline {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.windows(6).any(|w| w == b"reload") {
                        break;
                    }
                }
                Err(_) => {} // read timeout, poll again
            }
        }

        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("101"), "handshake missing: {text}");
        assert!(text.contains("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="), "bad accept key: {text}");
        assert!(buf.windows(6).any(|w| w == b"reload"), "no reload frame received");

        handle.stop();
        thread.join().unwrap();
    }

    #[test]
    fn test_reload_script_injected_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html><body>x</body></html>").unwrap();

        let mut config = test_config(dir.path());
        config.reload.enabled = true;
        // Watch nothing real; polling with a long interval stays quiet
        config.watch.force_polling = true;
        config.watch.poll_interval = 60.0;

        let (addr, handle, thread) = spawn_server(config);

        let response = get(addr, "/index.html");
        assert!(response.contains("/livereload.js"));

        let response = get(addr, "/livereload.js");
        assert!(response.contains("refreshcss"));

        handle.stop();
        thread.join().unwrap();
    }
}
