//! WebSocket upgrade on the shared HTTP port.
//!
//! Browsers hit the reserved path with a plain GET carrying the upgrade
//! headers. The connection is detached from the HTTP server after the 101
//! response and handed to tungstenite in server role, then parked in the
//! hub until a broadcast needs it.

use tiny_http::{Header, ReadWrite, Request, Response};
use tungstenite::{
    Message, WebSocket, handshake::derive_accept_key, protocol::Role,
};

use super::hub::{BroadcastHub, ReloadClient};
use crate::debug;

/// WebSocket over the stream detached from the HTTP connection.
pub struct WsClient {
    ws: WebSocket<Box<dyn ReadWrite + Send>>,
}

impl ReloadClient for WsClient {
    fn send_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::text(text))?;
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.ws.close(None);
        let _ = self.ws.flush();
    }
}

/// The hub type the server actually runs.
pub type Hub = BroadcastHub<WsClient>;

/// Complete the upgrade handshake and register the client.
///
/// A request without the WebSocket key gets a 400 and no registration.
pub fn handle_upgrade(request: Request, hub: &Hub) -> anyhow::Result<()> {
    let key = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Sec-WebSocket-Key"))
        .map(|h| h.value.as_str().to_owned());

    let Some(key) = key else {
        debug!("reload"; "upgrade request without Sec-WebSocket-Key");
        request.respond(Response::from_string("bad websocket handshake").with_status_code(400))?;
        return Ok(());
    };

    let accept = derive_accept_key(key.as_bytes());
    let response = Response::empty(101)
        .with_header(header("Sec-WebSocket-Accept", accept.as_bytes()));

    // upgrade() writes the 101 with Connection/Upgrade headers and hands
    // back the raw stream. It is a boxed trait object over buffered
    // halves; no socket deadline can be set on it.
    let stream = request.upgrade("websocket", response);
    let ws = WebSocket::from_raw_socket(stream, Role::Server, None);
    hub.register(WsClient { ws });
    Ok(())
}

fn header(key: &str, value: &[u8]) -> Header {
    Header::from_bytes(key, value).unwrap()
}
