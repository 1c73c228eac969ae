//! Typed messages exchanged with the remote simulation server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;

/// Body of a `ui_input` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum UiInput {
    SetForce(f64),
    ToggleController { controller: String },
    Play,
    Pause,
}

/// Body of an `input_event` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    pub sim_type: String,
    pub controllers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPayload {
    pub key: String,
}

/// Client to server.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    Init(InitPayload),
    Input(InputEvent),
    Ui(UiInput),
    KeyDown(String),
    KeyUp(String),
    UpdateParam(Value),
    GetOutput,
}

impl Outbound {
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Input(_) => "input_event",
            Self::Ui(_) => "ui_input",
            Self::KeyDown(_) => "keyboard_down",
            Self::KeyUp(_) => "keyboard_up",
            Self::UpdateParam(_) => "update_param",
            Self::GetOutput => "get_output",
        }
    }

    /// JSON argument of the event; `get_output` carries none.
    ///
    /// # Errors
    ///
    /// Serialisation failure of the payload.
    pub fn payload(&self) -> Result<Option<Value>, SessionError> {
        let value = match self {
            Self::Init(init) => serde_json::to_value(init)?,
            Self::Input(input) => serde_json::to_value(input)?,
            Self::Ui(ui) => serde_json::to_value(ui)?,
            Self::KeyDown(key) | Self::KeyUp(key) => serde_json::to_value(KeyPayload { key: key.clone() })?,
            Self::UpdateParam(params) => params.clone(),
            Self::GetOutput => return Ok(None),
        };
        Ok(Some(value))
    }
}

#[derive(Deserialize)]
struct StartedPayload {
    url: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: String,
}

/// Server to client.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    SimulationStarted { url: String },
    Error { message: String },
    SimData(Value),
    /// Any event this client does not interpret.
    Other { name: String, payload: Option<Value> },
}

impl Inbound {
    /// Interpret a named event.
    ///
    /// # Errors
    ///
    /// [`SessionError::Protocol`] when a known event has the wrong shape.
    pub fn from_event(name: &str, payload: Option<Value>) -> Result<Self, SessionError> {
        let malformed = |reason: String| SessionError::Protocol {
            event: name.to_owned(),
            reason,
        };
        match name {
            "simulation_started" => {
                let body: StartedPayload = serde_json::from_value(payload.unwrap_or(Value::Null))
                    .map_err(|e| malformed(e.to_string()))?;
                Ok(Self::SimulationStarted { url: body.url })
            }
            "error" => {
                let body: ErrorPayload = serde_json::from_value(payload.unwrap_or(Value::Null))
                    .map_err(|e| malformed(e.to_string()))?;
                Ok(Self::Error { message: body.message })
            }
            "sim_data" => Ok(Self::SimData(payload.unwrap_or(Value::Null))),
            _ => Ok(Self::Other {
                name: name.to_owned(),
                payload,
            }),
        }
    }
}
