use crate::types::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const CLIENT_MESSAGE_TYPES: [&str; 5] = ["init", "draw", "newLine", "undo", "clear"];

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("frame has no `type` field")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("cannot encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Draw sample as it arrives from a client. `userId` is optional on the wire;
/// the gateway falls back to the identity bound to the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Identity>,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub size: BrushSize,
    pub is_erasing: bool,
}

impl DrawCommand {
    pub fn into_point(self, user_id: Identity) -> Point {
        Point {
            user_id,
            x: self.x,
            y: self.y,
            color: self.color,
            size: self.size,
            is_erasing: self.is_erasing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Init {
        #[serde(rename = "userId", default)]
        user_id: Option<Identity>,
    },
    Draw(DrawCommand),
    NewLine {
        #[serde(rename = "userId", default)]
        user_id: Option<Identity>,
    },
    Undo {
        #[serde(rename = "userId", default)]
        user_id: Option<Identity>,
    },
    Clear {
        #[serde(rename = "userId", default)]
        user_id: Option<Identity>,
    },
}

impl ClientMessage {
    /// Parses one text frame. Unknown `type` values are reported separately
    /// from broken payloads so the gateway can drop them quietly.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(frame).map_err(ProtocolError::Malformed)?;
        match value.get("type").and_then(Value::as_str) {
            None => return Err(ProtocolError::MissingType),
            Some(kind) if !CLIENT_MESSAGE_TYPES.contains(&kind) => {
                return Err(ProtocolError::UnknownType(kind.to_owned()))
            }
            Some(_) => {}
        }
        serde_json::from_value(value).map_err(ProtocolError::Malformed)
    }

    pub fn user_id(&self) -> Option<&Identity> {
        match self {
            ClientMessage::Init { user_id }
            | ClientMessage::NewLine { user_id }
            | ClientMessage::Undo { user_id }
            | ClientMessage::Clear { user_id } => user_id.as_ref(),
            ClientMessage::Draw(command) => command.user_id.as_ref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Init { .. } => "init",
            ClientMessage::Draw(_) => "draw",
            ClientMessage::NewLine { .. } => "newLine",
            ClientMessage::Undo { .. } => "undo",
            ClientMessage::Clear { .. } => "clear",
        }
    }
}

/// Outbound frames. A cleared log is announced with `Undo`, which makes
/// clients repaint from the list; the browser client's `clear` handler would
/// wipe everyone's ink without repainting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Init { list: Snapshot },
    Draw(Point),
    NewLine,
    Undo { list: Snapshot },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Malformed)
    }
}
