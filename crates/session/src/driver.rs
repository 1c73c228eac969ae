//! Async event loop around a [`SessionClient`].

use serde_json::Value;
use tokio::sync::mpsc::{Receiver, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{SessionClient, SessionUpdate};
use crate::error::SessionError;
use crate::transport::{Transport, TransportEvent};

/// User intent forwarded to the client.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    Connect,
    Disconnect,
    ToggleController(String),
    SetForce(f64),
    Reset,
    Play,
    Pause,
    Keyboard { key: String, down: bool },
    UpdateParams(Value),
    RequestOutput,
    Shutdown,
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

fn apply<T: Transport>(client: &mut SessionClient<T>, command: SessionCommand) -> Result<(), SessionError> {
    match command {
        SessionCommand::Connect => client.connect(now()),
        SessionCommand::Disconnect => {
            client.disconnect();
            Ok(())
        }
        SessionCommand::ToggleController(id) => client.toggle_controller(&id).map(|_| ()),
        SessionCommand::SetForce(force) => client.set_force(force),
        SessionCommand::Reset => client.reset(),
        SessionCommand::Play => client.set_playback(true),
        SessionCommand::Pause => client.set_playback(false),
        SessionCommand::Keyboard { key, down } => client.send_keyboard_input(&key, down),
        SessionCommand::UpdateParams(params) => client.update_params(params),
        SessionCommand::RequestOutput => client.request_output(),
        // Handled by the loop.
        SessionCommand::Shutdown => Ok(()),
    }
}

fn flush<T: Transport>(client: &mut SessionClient<T>, updates: &UnboundedSender<SessionUpdate>) {
    for update in client.drain_updates() {
        if updates.send(update).is_err() {
            debug!("update receiver gone");
        }
    }
}

/// Run `client` until a [`SessionCommand::Shutdown`] arrives or the command
/// channel closes, then hand it back.
///
/// Transport events, commands and the connect deadline are served in that
/// order of priority. Updates are forwarded after every step.
pub async fn drive<T: Transport>(
    mut client: SessionClient<T>,
    mut events: UnboundedReceiver<TransportEvent>,
    mut commands: Receiver<SessionCommand>,
    updates: UnboundedSender<SessionUpdate>,
) -> SessionClient<T> {
    info!(url = %client.config().url, "session driver started");
    loop {
        let deadline = client.deadline();
        let timeout = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(Instant::from_std(d)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            Some(event) = events.recv() => client.handle_event(event),
            command = commands.recv() => match command {
                Some(SessionCommand::Shutdown) | None => {
                    client.disconnect();
                    flush(&mut client, &updates);
                    break;
                }
                Some(command) => {
                    let name = format!("{command:?}");
                    if let Err(e) = apply(&mut client, command) {
                        warn!(command = %name, error = %e, "session command failed");
                    }
                }
            },
            () = timeout => {
                client.poll_timeout(now());
            }
        }
        flush(&mut client, &updates);
    }
    info!("session driver stopped");
    client
}
