//! Opaque global identifiers for node lookups (`base64("Audio:42")`).

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;

use crate::domain::error::DomainError;

const NODE_ID: &str = "node id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Audio,
    User,
    Playlist,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Audio => "Audio",
            NodeKind::User => "User",
            NodeKind::Playlist => "Playlist",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Audio" => Some(NodeKind::Audio),
            "User" => Some(NodeKind::User),
            "Playlist" => Some(NodeKind::Playlist),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalId {
    pub kind: NodeKind,
    pub id: i64,
}

impl GlobalId {
    pub fn new(kind: NodeKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.kind.as_str(), self.id))
    }

    pub fn decode(value: &str) -> Result<Self, DomainError> {
        let bytes = STANDARD
            .decode(value)
            .map_err(|err| DomainError::malformed(NODE_ID, format!("not base64 ({err})")))?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| DomainError::malformed(NODE_ID, "not utf-8"))?;
        let (kind, id) = raw
            .split_once(':')
            .ok_or_else(|| DomainError::malformed(NODE_ID, "missing a type prefix"))?;
        let kind = NodeKind::parse(kind)
            .ok_or_else(|| DomainError::malformed(NODE_ID, format!("unknown type `{kind}`")))?;
        let id = id
            .parse::<i64>()
            .map_err(|_| DomainError::malformed(NODE_ID, "id is not numeric"))?;
        Ok(Self { kind, id })
    }
}
