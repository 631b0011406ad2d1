use serde::{Deserialize, Serialize};

use crate::state::tournament::{
    Challenge, Match, MatchScore, MatchStatus, Settings, SlotOutcome, Team, Theme,
    TournamentState,
};

/// Version written in every saved document.
pub const SCHEMA_VERSION: u32 = 1;

/// Envelope persisted by tournament stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TournamentDocument {
    /// Layout version of `state`.
    pub schema_version: u32,
    /// RFC 3339 timestamp of the save.
    pub saved_at: String,
    /// Saved tournament.
    pub state: TournamentEntity,
}

impl TournamentDocument {
    /// Wrap `state` with the current schema version and timestamp.
    pub fn new(state: TournamentEntity, saved_at: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            saved_at,
            state,
        }
    }
}

/// Persisted form of a tournament.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TournamentEntity {
    pub bracket: Vec<MatchEntity>,
    pub leaderboard: Vec<Team>,
    pub settings: Settings,
    #[serde(default)]
    pub current_match_id: Option<String>,
    #[serde(default)]
    pub global_used_challenge_ids: Vec<String>,
    pub final_match_id: String,
    #[serde(default)]
    pub third_place_match_id: Option<String>,
}

/// Persisted form of a match; teams are referenced by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntity {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub team_a: Option<String>,
    #[serde(default)]
    pub team_b: Option<String>,
    #[serde(default)]
    pub source_a: Option<String>,
    #[serde(default)]
    pub source_b: Option<String>,
    #[serde(default)]
    pub source_outcome: SlotOutcome,
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub loser_id: Option<String>,
    pub score: MatchScore,
    pub status: MatchStatus,
    #[serde(default)]
    pub current_challenge: Option<Challenge>,
    #[serde(default)]
    pub active_theme: Option<Theme>,
    #[serde(default)]
    pub disabled_themes: Vec<Theme>,
    #[serde(default)]
    pub used_challenge_ids: Vec<String>,
}

impl From<&Match> for MatchEntity {
    fn from(value: &Match) -> Self {
        Self {
            id: value.id.clone(),
            label: value.label.clone(),
            team_a: value.team_a.clone(),
            team_b: value.team_b.clone(),
            source_a: value.source_a.clone(),
            source_b: value.source_b.clone(),
            source_outcome: value.source_outcome,
            winner_id: value.winner_id.clone(),
            loser_id: value.loser_id.clone(),
            score: value.score,
            status: value.status,
            current_challenge: value.current_challenge.clone(),
            active_theme: value.active_theme,
            disabled_themes: value.disabled_themes.clone(),
            used_challenge_ids: value.used_challenge_ids.clone(),
        }
    }
}

impl From<MatchEntity> for Match {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            label: value.label,
            team_a: value.team_a,
            team_b: value.team_b,
            source_a: value.source_a,
            source_b: value.source_b,
            source_outcome: value.source_outcome,
            winner_id: value.winner_id,
            loser_id: value.loser_id,
            score: value.score,
            status: value.status,
            current_challenge: value.current_challenge,
            active_theme: value.active_theme,
            disabled_themes: value.disabled_themes,
            used_challenge_ids: value.used_challenge_ids,
        }
    }
}

impl From<&TournamentState> for TournamentEntity {
    fn from(value: &TournamentState) -> Self {
        Self {
            bracket: value.bracket.iter().map(MatchEntity::from).collect(),
            leaderboard: value.leaderboard.clone(),
            settings: value.settings,
            current_match_id: value.current_match_id.clone(),
            global_used_challenge_ids: value.global_used_challenge_ids.clone(),
            final_match_id: value.final_match_id.clone(),
            third_place_match_id: value.third_place_match_id.clone(),
        }
    }
}

impl From<TournamentEntity> for TournamentState {
    fn from(value: TournamentEntity) -> Self {
        Self {
            bracket: value.bracket.into_iter().map(Match::from).collect(),
            leaderboard: value.leaderboard,
            settings: value.settings,
            current_match_id: value.current_match_id,
            global_used_challenge_ids: value.global_used_challenge_ids,
            final_match_id: value.final_match_id,
            third_place_match_id: value.third_place_match_id,
        }
    }
}
