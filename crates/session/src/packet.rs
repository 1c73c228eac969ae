//! # Wire Packets
//!
//! Text framing for Engine.IO v4 and the Socket.IO v4 packets carried in
//! its `message` packets. Binary attachments are not supported.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,..}   engine open
//! 2 / 3                                   engine ping / pong
//! 40                                      socket connect, default namespace
//! 42["simulation_started",{"url":".."}]   socket event
//! 42/admin,7["init",{..}]                 namespace and ack id
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("empty packet")]
    Empty,
    #[error("unknown {layer} packet type `{kind}`")]
    UnknownType { layer: &'static str, kind: char },
    #[error("binary packets are not supported")]
    Binary,
    #[error("bad packet payload: {0}")]
    Payload(String),
}

impl From<serde_json::Error> for PacketError {
    fn from(e: serde_json::Error) -> Self {
        Self::Payload(e.to_string())
    }
}

/// Body of the Engine.IO `open` packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

impl EnginePacket {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(h) => {
                let mut body = json!({
                    "sid": h.sid,
                    "upgrades": h.upgrades,
                    "pingInterval": h.ping_interval,
                    "pingTimeout": h.ping_timeout,
                });
                if let Some(max) = h.max_payload {
                    body["maxPayload"] = json!(max);
                }
                format!("0{body}")
            }
            Self::Close => "1".to_owned(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(packet) => format!("4{}", packet.encode()),
            Self::Upgrade => "5".to_owned(),
            Self::Noop => "6".to_owned(),
        }
    }

    /// # Errors
    ///
    /// Fails on an empty frame, an unknown type digit or a malformed body.
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        let rest = chars.as_str();
        Ok(match kind {
            '0' => Self::Open(serde_json::from_str(rest)?),
            '1' => Self::Close,
            '2' => Self::Ping(rest.to_owned()),
            '3' => Self::Pong(rest.to_owned()),
            '4' => Self::Message(SocketPacket::decode(rest)?),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            kind => return Err(PacketError::UnknownType { layer: "engine", kind }),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    /// Client: join a namespace (optional auth payload).
    /// Server: acknowledge the join (`{"sid": ..}`).
    Connect { namespace: String, data: Option<Value> },
    Disconnect { namespace: String },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError { namespace: String, data: Value },
}

impl SocketPacket {
    /// Join the default namespace without auth.
    #[must_use]
    pub fn connect() -> Self {
        Self::Connect {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            data: None,
        }
    }

    /// Event on the default namespace, no ack requested.
    #[must_use]
    pub fn event(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            id: None,
            name: name.into(),
            args,
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        let (kind, id, data) = match self {
            Self::Connect { data, .. } => ('0', None, data.clone()),
            Self::Disconnect { .. } => ('1', None, None),
            Self::Event { id, name, args, .. } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                ('2', *id, Some(Value::Array(array)))
            }
            Self::Ack { id, args, .. } => ('3', Some(*id), Some(Value::Array(args.clone()))),
            Self::ConnectError { data, .. } => ('4', None, Some(data.clone())),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// # Errors
    ///
    /// Fails on an empty packet, binary packet types, unknown types and
    /// malformed JSON or event arrays.
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        if matches!(kind, '5' | '6') {
            return Err(PacketError::Binary);
        }
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            let namespace = rest[..end].to_owned();
            rest = rest.get(end + 1..).unwrap_or("");
            namespace
        } else {
            DEFAULT_NAMESPACE.to_owned()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|e| PacketError::Payload(e.to_string()))?,
            )
        } else {
            None
        };
        rest = &rest[digits..];

        let data: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        Ok(match kind {
            '0' => Self::Connect { namespace, data },
            '1' => Self::Disconnect { namespace },
            '2' => {
                let Some(Value::Array(mut array)) = data else {
                    return Err(PacketError::Payload("event payload must be an array".into()));
                };
                if array.is_empty() {
                    return Err(PacketError::Payload("event without a name".into()));
                }
                let Value::String(name) = array.remove(0) else {
                    return Err(PacketError::Payload("event name must be a string".into()));
                };
                Self::Event {
                    namespace,
                    id,
                    name,
                    args: array,
                }
            }
            '3' => {
                let id = id.ok_or_else(|| PacketError::Payload("ack without id".into()))?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                Self::Ack { namespace, id, args }
            }
            '4' => Self::ConnectError {
                namespace,
                data: data.unwrap_or(Value::Null),
            },
            kind => return Err(PacketError::UnknownType { layer: "socket", kind }),
        })
    }
}
