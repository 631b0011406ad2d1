//! Local copy of the tournament kept in step with the realtime channel.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    dto::{
        snapshot::{MatchSnapshot, TournamentSnapshot},
        ws::ServerMessage,
    },
    state::tournament::{Challenge, MatchStatus, Team},
};

/// A sound cue with its arrival order, so two identical cues in a row stay distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfxCue {
    pub event: String,
    pub sequence: u64,
}

/// What a screen renders from.
#[derive(Debug, Clone, Default)]
pub struct MirrorState {
    pub snapshot: Option<Arc<TournamentSnapshot>>,
    pub last_sfx: Option<SfxCue>,
    pub connected: bool,
}

impl MirrorState {
    /// Match flagged as current by the host, if any.
    pub fn current_match(&self) -> Option<&MatchSnapshot> {
        let snapshot = self.snapshot.as_deref()?;
        snapshot.find_match(snapshot.current_match_id.as_deref()?)
    }

    /// Challenge on screen in the current match, with its countdown in seconds.
    pub fn current_challenge(&self) -> Option<(&Challenge, u32)> {
        let timers = self.snapshot.as_deref()?.settings.timers;
        let challenge = self.current_match()?.current_challenge.as_ref()?;
        Some((challenge, timers.seconds(challenge.theme)))
    }

    /// Match the host should put on screen next: an in-progress match first, otherwise
    /// the first pending match whose two teams are known.
    pub fn next_match_to_start(&self) -> Option<&MatchSnapshot> {
        let bracket = &self.snapshot.as_deref()?.bracket;
        bracket
            .iter()
            .find(|game| game.status == MatchStatus::InProgress)
            .or_else(|| {
                bracket
                    .iter()
                    .find(|game| game.status == MatchStatus::Pending && game.is_ready())
            })
    }

    /// The final and third-place match are both decided.
    pub fn is_complete(&self) -> bool {
        self.snapshot.as_deref().is_some_and(|snapshot| snapshot.complete)
    }

    /// Teams ordered by score, highest first; ties keep the roster order.
    pub fn sorted_leaderboard(&self) -> Vec<Team> {
        let mut teams = self
            .snapshot
            .as_deref()
            .map(|snapshot| snapshot.leaderboard.clone())
            .unwrap_or_default();
        teams.sort_by(|a, b| b.score.cmp(&a.score));
        teams
    }
}

/// How a frame changed the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEffect {
    /// The snapshot was replaced.
    Snapshot,
    /// A sound cue was recorded.
    Sfx,
    /// Nothing changed.
    Ignored,
}

/// Shared, watchable mirror of the server state.
#[derive(Debug, Clone)]
pub struct SnapshotMirror {
    state: Arc<watch::Sender<MirrorState>>,
}

impl Default for SnapshotMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotMirror {
    /// Empty, disconnected mirror.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(MirrorState::default());
        Self {
            state: Arc::new(tx),
        }
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<MirrorState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn current(&self) -> MirrorState {
        self.state.borrow().clone()
    }

    /// Apply one raw frame from the realtime channel.
    pub fn apply_frame(&self, text: &str) -> FrameEffect {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "ignoring malformed frame");
                return FrameEffect::Ignored;
            }
        };

        match message {
            ServerMessage::StateUpdate { data } => {
                self.replace_snapshot(*data);
                FrameEffect::Snapshot
            }
            ServerMessage::Sfx { event } => {
                self.state.send_modify(|state| {
                    let sequence = state.last_sfx.as_ref().map_or(1, |cue| cue.sequence + 1);
                    state.last_sfx = Some(SfxCue { event, sequence });
                });
                FrameEffect::Sfx
            }
            other => {
                debug!(kind = other.kind(), "frame carries no state; waiting for snapshot");
                FrameEffect::Ignored
            }
        }
    }

    /// Install a snapshot fetched out of band.
    pub fn replace_snapshot(&self, snapshot: TournamentSnapshot) {
        self.state.send_modify(|state| state.snapshot = Some(Arc::new(snapshot)));
    }

    /// Record the connection status, notifying watchers only when it flips.
    pub fn set_connected(&self, connected: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.connected != connected;
            state.connected = connected;
            changed
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::content::ContentLibrary,
        state::{
            bracket::BracketTopology,
            engine::BracketEngine,
            tournament::{Settings, Theme},
        },
    };

    fn snapshot() -> TournamentSnapshot {
        let teams = (1..=8)
            .map(|i| Team::new(format!("t{i}"), format!("Team {i}"), vec![]))
            .collect();
        let engine = BracketEngine::new(
            BracketTopology::eight_teams(),
            teams,
            Settings::default(),
            Arc::new(ContentLibrary::from_challenges([])),
        )
        .unwrap();
        TournamentSnapshot::from(engine.state())
    }

    fn frame(message: &ServerMessage) -> String {
        serde_json::to_string(message).unwrap()
    }

    #[test]
    fn state_update_replaces_snapshot() {
        let mirror = SnapshotMirror::new();
        let effect = mirror.apply_frame(&frame(&ServerMessage::StateUpdate {
            data: Box::new(snapshot()),
        }));
        assert_eq!(effect, FrameEffect::Snapshot);
        assert_eq!(mirror.current().snapshot.unwrap().bracket.len(), 8);
    }

    #[test]
    fn repeated_sfx_get_increasing_sequence_numbers() {
        let mirror = SnapshotMirror::new();
        let cue = frame(&ServerMessage::Sfx {
            event: "buzzer".into(),
        });
        mirror.apply_frame(&cue);
        mirror.apply_frame(&cue);
        let last = mirror.current().last_sfx.unwrap();
        assert_eq!(last.event, "buzzer");
        assert_eq!(last.sequence, 2);
    }

    #[test]
    fn unknown_and_malformed_frames_are_ignored() {
        let mirror = SnapshotMirror::new();
        assert_eq!(
            mirror.apply_frame(r#"{"type":"confetti"}"#),
            FrameEffect::Ignored
        );
        assert_eq!(mirror.apply_frame("not json"), FrameEffect::Ignored);
        assert_eq!(
            mirror.apply_frame(&frame(&ServerMessage::SystemStatus { degraded: true })),
            FrameEffect::Ignored
        );
        assert!(mirror.current().snapshot.is_none());
    }

    #[test]
    fn next_match_prefers_the_one_in_progress() {
        let mut snapshot = snapshot();
        let mirror = SnapshotMirror::new();
        mirror.replace_snapshot(snapshot.clone());
        assert_eq!(
            mirror.current().next_match_to_start().map(|m| m.id.as_str()),
            Some("g1")
        );

        snapshot.bracket[2].status = MatchStatus::InProgress;
        snapshot.current_match_id = Some(snapshot.bracket[2].id.clone());
        mirror.replace_snapshot(snapshot);
        let state = mirror.current();
        assert_eq!(state.next_match_to_start().map(|m| m.id.as_str()), Some("g3"));
        assert_eq!(state.current_match().map(|m| m.id.as_str()), Some("g3"));
        assert!(!state.is_complete());
    }

    #[test]
    fn current_challenge_carries_its_theme_timer() {
        let mut snapshot = snapshot();
        let mirror = SnapshotMirror::new();
        mirror.replace_snapshot(snapshot.clone());
        assert!(mirror.current().current_challenge().is_none());

        snapshot.bracket[0].status = MatchStatus::InProgress;
        snapshot.bracket[0].current_challenge = Some(Challenge {
            id: "e1".into(),
            theme: Theme::Emoji,
            prompt: "🐝🎬".into(),
            answer: "Bee Movie".into(),
            metadata: None,
        });
        snapshot.current_match_id = Some("g1".into());
        mirror.replace_snapshot(snapshot);

        let state = mirror.current();
        let (challenge, seconds) = state.current_challenge().unwrap();
        assert_eq!(challenge.id, "e1");
        assert_eq!(seconds, 25);
    }

    #[test]
    fn leaderboard_is_sorted_by_score() {
        let mut snapshot = snapshot();
        snapshot.leaderboard[3].score = 6;
        snapshot.leaderboard[5].score = 2;
        let mirror = SnapshotMirror::new();
        mirror.replace_snapshot(snapshot);

        let ids: Vec<String> = mirror
            .current()
            .sorted_leaderboard()
            .into_iter()
            .take(3)
            .map(|team| team.id)
            .collect();
        assert_eq!(ids, ["t4", "t6", "t1"]);
    }

    #[test]
    fn connection_flag_notifies_on_change_only() {
        let mirror = SnapshotMirror::new();
        let mut rx = mirror.subscribe();
        mirror.set_connected(false);
        assert!(!rx.has_changed().unwrap());
        mirror.set_connected(true);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().connected);
    }
}
