//! # Transports
//!
//! The session state machine only sees the [`Transport`] trait and a stream
//! of [`TransportEvent`]s. [`WebSocketTransport`] is the real implementation:
//! Socket.IO v4 over an Engine.IO v4 WebSocket, one tokio task per
//! connection attempt.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::SessionError;
use crate::packet::{EnginePacket, SocketPacket};

/// Something that happened on connection attempt `generation`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportEvent {
    pub generation: u64,
    pub kind: TransportEventKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportEventKind {
    /// The server acknowledged the namespace connect.
    Connected { sid: String },
    Event { name: String, payload: Option<Value> },
    /// The server refused the namespace connect.
    ConnectError(String),
    /// The connection ended, from either side.
    Closed { reason: String },
}

pub trait Transport: Send {
    /// Start connection attempt `generation`, abandoning any previous one.
    /// Must not block; the outcome arrives as [`TransportEvent`]s.
    ///
    /// # Errors
    ///
    /// Fails if the attempt cannot even be started.
    fn open(&mut self, generation: u64) -> Result<(), SessionError>;

    /// Send one event on the current connection.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] without an open connection.
    fn emit(&mut self, event: &str, payload: Option<Value>) -> Result<(), SessionError>;

    /// Drop the current connection, if any. Idempotent.
    fn close(&mut self);
}

/// Socket.IO endpoint for a server base url (`http` becomes `ws`, `https`
/// becomes `wss`).
///
/// # Errors
///
/// Fails for an unparsable url or a scheme other than http(s)/ws(s).
pub fn socket_io_endpoint(base: &str) -> Result<Url, SessionError> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(SessionError::UnsupportedScheme(other.to_owned())),
    };
    url.set_scheme(scheme)
        .map_err(|()| SessionError::UnsupportedScheme(scheme.to_owned()))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

pub struct WebSocketTransport {
    endpoint: Url,
    runtime: Handle,
    events: UnboundedSender<TransportEvent>,
    outbound: Option<UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// # Errors
    ///
    /// See [`socket_io_endpoint`].
    pub fn new(base_url: &str, runtime: Handle, events: UnboundedSender<TransportEvent>) -> Result<Self, SessionError> {
        Ok(Self {
            endpoint: socket_io_endpoint(base_url)?,
            runtime,
            events,
            outbound: None,
            task: None,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, generation: u64) -> Result<(), SessionError> {
        self.close();
        let (tx, rx) = mpsc::unbounded_channel();
        info!(endpoint = %self.endpoint, generation, "opening websocket");
        self.task = Some(self.runtime.spawn(run_connection(
            self.endpoint.clone(),
            generation,
            rx,
            self.events.clone(),
        )));
        self.outbound = Some(tx);
        Ok(())
    }

    fn emit(&mut self, event: &str, payload: Option<Value>) -> Result<(), SessionError> {
        let tx = self.outbound.as_ref().ok_or(SessionError::NotConnected)?;
        let packet = EnginePacket::Message(SocketPacket::event(event, payload.into_iter().collect()));
        tx.send(packet.encode()).map_err(|_| SessionError::NotConnected)
    }

    fn close(&mut self) {
        if let Some(tx) = self.outbound.take() {
            // Best effort: the task may already be gone.
            let _ = tx.send(EnginePacket::Message(SocketPacket::Disconnect {
                namespace: crate::packet::DEFAULT_NAMESPACE.to_owned(),
            })
            .encode());
        }
        // The task finishes on its own once it sees the channel close.
        self.task = None;
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    endpoint: Url,
    generation: u64,
    mut outbound: UnboundedReceiver<String>,
    events: UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        if events.send(TransportEvent { generation, kind }).is_err() {
            trace!(generation, "event receiver gone");
        }
    };
    let closed = |reason: String| TransportEventKind::Closed { reason };

    let stream = tokio::select! {
        result = tokio_tungstenite::connect_async(endpoint.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                emit(closed(e.to_string()));
                return;
            }
        },
        // Closed (or asked to disconnect) before the socket was up.
        _ = outbound.recv() => {
            debug!(generation, "attempt abandoned while connecting");
            return;
        }
    };
    let (mut sink, mut source) = stream.split();
    debug!(generation, "websocket open");

    loop {
        tokio::select! {
            frame = source.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        emit(closed("transport close".to_owned()));
                        return;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        emit(closed(e.to_string()));
                        return;
                    }
                };
                let reply = match EnginePacket::decode(text.as_str()) {
                    Ok(EnginePacket::Open(handshake)) => {
                        debug!(generation, sid = %handshake.sid, ping_interval = handshake.ping_interval, "engine open");
                        Some(EnginePacket::Message(SocketPacket::connect()))
                    }
                    Ok(EnginePacket::Ping(data)) => Some(EnginePacket::Pong(data)),
                    Ok(EnginePacket::Close) => {
                        emit(closed("server close".to_owned()));
                        return;
                    }
                    Ok(EnginePacket::Message(packet)) => {
                        if let Some(kind) = socket_event(packet) {
                            let end = matches!(kind, TransportEventKind::Closed { .. });
                            emit(kind);
                            if end {
                                return;
                            }
                        }
                        None
                    }
                    Ok(_) => None,
                    Err(e) => {
                        warn!(generation, error = %e, "undecodable frame");
                        None
                    }
                };
                if let Some(reply) = reply {
                    if let Err(e) = sink.send(Message::text(reply.encode())).await {
                        emit(closed(e.to_string()));
                        return;
                    }
                }
            }
            message = outbound.recv() => match message {
                Some(text) => {
                    trace!(generation, %text, "send");
                    if let Err(e) = sink.send(Message::text(text)).await {
                        emit(closed(e.to_string()));
                        return;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    debug!(generation, "websocket closed locally");
                    return;
                }
            }
        }
    }
}

/// Map an inbound Socket.IO packet to a transport event.
fn socket_event(packet: SocketPacket) -> Option<TransportEventKind> {
    match packet {
        SocketPacket::Connect { data, .. } => {
            let sid = data
                .as_ref()
                .and_then(|d| d.get("sid"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            Some(TransportEventKind::Connected { sid })
        }
        SocketPacket::Event { name, args, .. } => Some(TransportEventKind::Event {
            name,
            payload: args.into_iter().next(),
        }),
        SocketPacket::Disconnect { .. } => Some(TransportEventKind::Closed {
            reason: "io server disconnect".to_owned(),
        }),
        SocketPacket::ConnectError { data, .. } => {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| data.to_string(), str::to_owned);
            Some(TransportEventKind::ConnectError(message))
        }
        SocketPacket::Ack { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_maps_scheme_and_path() {
        assert_eq!(
            socket_io_endpoint("http://localhost:8000").unwrap().as_str(),
            "ws://localhost:8000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_io_endpoint("https://example.com/").unwrap().scheme(),
            "wss"
        );
        assert!(matches!(
            socket_io_endpoint("ftp://example.com"),
            Err(SessionError::UnsupportedScheme(_))
        ));
        assert!(matches!(socket_io_endpoint("not a url"), Err(SessionError::InvalidUrl(_))));
    }

    #[test]
    fn socket_packets_map_to_events() {
        assert_eq!(
            socket_event(SocketPacket::Connect {
                namespace: "/".into(),
                data: Some(json!({"sid": "s1"})),
            }),
            Some(TransportEventKind::Connected { sid: "s1".into() })
        );
        assert_eq!(
            socket_event(SocketPacket::ConnectError {
                namespace: "/".into(),
                data: json!({"message": "nope"}),
            }),
            Some(TransportEventKind::ConnectError("nope".into()))
        );
        assert_eq!(
            socket_event(SocketPacket::event("sim_data", vec![json!(1), json!(2)])),
            Some(TransportEventKind::Event {
                name: "sim_data".into(),
                payload: Some(json!(1)),
            })
        );
    }

    #[test]
    fn emit_without_connection_fails() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new("http://localhost:1", runtime.handle().clone(), tx).unwrap();
        assert!(matches!(transport.emit("init", None), Err(SessionError::NotConnected)));
        transport.close();
    }
}
