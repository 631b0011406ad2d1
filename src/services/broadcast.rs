//! Builders for the realtime messages fanned out to viewers.

use tracing::{debug, warn};

use crate::{
    dto::{
        snapshot::TournamentSnapshot,
        ws::{ServerFrame, ServerMessage},
    },
    state::{
        AppState,
        tournament::{Challenge, Match, MatchScore, TournamentState},
    },
};

/// Wrap the full state into a `state:update` message.
pub fn snapshot_message(state: &TournamentState) -> ServerMessage {
    ServerMessage::StateUpdate {
        data: Box::new(TournamentSnapshot::from(state)),
    }
}

/// Broadcast the authoritative snapshot.
pub fn broadcast_snapshot(state: &AppState, tournament: &TournamentState) {
    broadcast_message(state, &snapshot_message(tournament));
}

/// `match:start` for a match that just went on screen.
pub fn match_start_message(game: &Match) -> ServerMessage {
    ServerMessage::MatchStart {
        match_id: game.id.clone(),
        challenge: game.current_challenge.clone(),
    }
}

/// `challenge:new` for a freshly drawn challenge.
pub fn challenge_message(match_id: &str, challenge: &Challenge) -> ServerMessage {
    ServerMessage::ChallengeNew {
        match_id: match_id.to_string(),
        challenge: challenge.clone(),
    }
}

/// `score:update` for a match tally change.
pub fn score_message(match_id: &str, score: MatchScore, resolved: bool) -> ServerMessage {
    ServerMessage::ScoreUpdate {
        match_id: match_id.to_string(),
        score,
        resolved,
    }
}

/// `match:advance` for a completed match.
pub fn match_advance_message(game: &Match) -> ServerMessage {
    ServerMessage::MatchAdvance {
        match_id: game.id.clone(),
        winner_id: game.winner_id.clone(),
        loser_id: game.loser_id.clone(),
    }
}

/// Broadcast a sound cue.
pub fn broadcast_sfx(state: &AppState, event: &str) {
    broadcast_message(
        state,
        &ServerMessage::Sfx {
            event: event.to_string(),
        },
    );
}

/// Broadcast that the service entered or left degraded mode.
pub fn broadcast_system_status(state: &AppState, degraded: bool) {
    broadcast_message(state, &ServerMessage::SystemStatus { degraded });
}

/// Encode `message` once and hand it to the hub.
pub fn broadcast_message(state: &AppState, message: &ServerMessage) {
    match ServerFrame::encode(message) {
        Ok(frame) => {
            debug!(
                kind = frame.kind,
                viewers = state.hub().receiver_count(),
                "broadcasting"
            );
            state.hub().broadcast(frame);
        }
        Err(err) => warn!(kind = message.kind(), error = %err, "failed to serialise message"),
    }
}
