use serde::{Deserialize, Serialize};

/// Client-chosen token naming the author of a log. Never verified.
pub type Identity = String;

pub type ConnectionId = u32;

/// Brush size as sent by the client: the size picker reports a string, some
/// clients send a number. Kept as received so forwarded points are unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrushSize {
    Number(serde_json::Number),
    Text(String),
}

impl From<u32> for BrushSize {
    fn from(size: u32) -> Self {
        BrushSize::Number(size.into())
    }
}

impl From<&str> for BrushSize {
    fn from(size: &str) -> Self {
        BrushSize::Text(size.to_owned())
    }
}

/// One drawing sample, tagged with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub user_id: Identity,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub size: BrushSize,
    pub is_erasing: bool,
}

/// Entry of an identity's log. Serialized exactly like the draw and newLine
/// frames so a snapshot can be replayed by the client's event handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    #[serde(rename = "draw")]
    Point(Point),
    #[serde(rename = "newLine")]
    LineBreak,
}

impl Action {
    pub fn is_line_break(&self) -> bool {
        matches!(self, Action::LineBreak)
    }

    pub fn as_point(&self) -> Option<&Point> {
        match self {
            Action::Point(point) => Some(point),
            Action::LineBreak => None,
        }
    }
}

/// Every known identity's log, in the order identities were first seen.
pub type Snapshot = Vec<Vec<Action>>;
