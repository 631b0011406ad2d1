use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::snapshot::TournamentSnapshot,
    state::tournament::{Challenge, MatchScore},
};

/// Message pushed to every connected viewer.
///
/// `state:update` carries the authoritative snapshot; the other kinds are
/// informational and may be ignored by clients that only render snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "state:update")]
    StateUpdate { data: Box<TournamentSnapshot> },
    #[serde(rename = "sfx")]
    Sfx { event: String },
    #[serde(rename = "match:start", rename_all = "camelCase")]
    MatchStart {
        match_id: String,
        challenge: Option<Challenge>,
    },
    #[serde(rename = "challenge:new", rename_all = "camelCase")]
    ChallengeNew {
        match_id: String,
        challenge: Challenge,
    },
    #[serde(rename = "score:update", rename_all = "camelCase")]
    ScoreUpdate {
        match_id: String,
        score: MatchScore,
        resolved: bool,
    },
    #[serde(rename = "match:advance", rename_all = "camelCase")]
    MatchAdvance {
        match_id: String,
        winner_id: Option<String>,
        loser_id: Option<String>,
    },
    #[serde(rename = "system:status")]
    SystemStatus { degraded: bool },
    /// Any message kind this build does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Wire name of the message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::StateUpdate { .. } => "state:update",
            ServerMessage::Sfx { .. } => "sfx",
            ServerMessage::MatchStart { .. } => "match:start",
            ServerMessage::ChallengeNew { .. } => "challenge:new",
            ServerMessage::ScoreUpdate { .. } => "score:update",
            ServerMessage::MatchAdvance { .. } => "match:advance",
            ServerMessage::SystemStatus { .. } => "system:status",
            ServerMessage::Unknown => "unknown",
        }
    }
}

/// Serialized message shared by every viewer subscribed to the hub.
#[derive(Clone, Debug)]
pub struct ServerFrame {
    pub kind: &'static str,
    pub text: Arc<str>,
}

impl ServerFrame {
    /// Serialise `message` once so each viewer only clones a pointer.
    pub fn encode(message: &ServerMessage) -> serde_json::Result<Self> {
        Ok(Self {
            kind: message.kind(),
            text: serde_json::to_string(message)?.into(),
        })
    }
}

/// Frames a viewer may send.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum ViewerMessage {
    /// Ask for a fresh snapshot.
    #[serde(rename = "state:request")]
    StateRequest,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sfx_message_shape() {
        let message = ServerMessage::Sfx {
            event: "correct".into(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({"type": "sfx", "event": "correct"}));
    }

    #[test]
    fn advance_message_uses_camel_case() {
        let message = ServerMessage::MatchAdvance {
            match_id: "g1".into(),
            winner_id: Some("t1".into()),
            loser_id: Some("t2".into()),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "match:advance");
        assert_eq!(json["matchId"], "g1");
        assert_eq!(json["winnerId"], "t1");
    }

    #[test]
    fn unknown_kinds_are_tolerated() {
        let message: ServerMessage =
            serde_json::from_str(r#"{"type":"confetti","color":"gold"}"#).unwrap();
        assert!(matches!(message, ServerMessage::Unknown));

        let inbound: ViewerMessage = serde_json::from_str(r#"{"type":"hello"}"#).unwrap();
        assert!(matches!(inbound, ViewerMessage::Unknown));
        let inbound: ViewerMessage = serde_json::from_str(r#"{"type":"state:request"}"#).unwrap();
        assert!(matches!(inbound, ViewerMessage::StateRequest));
    }
}
