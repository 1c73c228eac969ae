#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Cart-Pole Session
//!
//! Client side of a remote simulation session. A server runs its own
//! cart-pole and publishes a visualization url; this crate connects to it,
//! relays user intents and tracks what the server reported.
//!
//! -   [`packet`] is the Engine.IO / Socket.IO text framing.
//! -   [`protocol`] holds the typed events exchanged with the server.
//! -   [`SessionClient`] is the connection state machine. It does no I/O.
//! -   [`WebSocketTransport`] carries it over a real socket and [`drive`]
//!     runs both on tokio.
//!
//! ```no_run
//! # async fn run() -> Result<(), session::SessionError> {
//! use session::{drive, SessionClient, SessionCommand, SessionConfig, WebSocketTransport};
//! use tokio::sync::mpsc;
//!
//! let config = SessionConfig::default();
//! let (event_tx, event_rx) = mpsc::unbounded_channel();
//! let transport = WebSocketTransport::new(&config.url, tokio::runtime::Handle::current(), event_tx)?;
//! let (command_tx, command_rx) = mpsc::channel(16);
//! let (update_tx, _update_rx) = mpsc::unbounded_channel();
//!
//! let driver = tokio::spawn(drive(SessionClient::new(config, transport), event_rx, command_rx, update_tx));
//! command_tx.send(SessionCommand::Connect).await.ok();
//! command_tx.send(SessionCommand::Shutdown).await.ok();
//! driver.await.ok();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod packet;
pub mod protocol;
pub mod transport;

pub use client::{ConnectionPhase, SessionClient, SessionState, SessionUpdate, Severity, StatusMessage};
pub use config::SessionConfig;
pub use driver::{drive, SessionCommand};
pub use error::SessionError;
pub use protocol::{Inbound, Outbound, UiInput};
pub use transport::{socket_io_endpoint, Transport, TransportEvent, TransportEventKind, WebSocketTransport};
