//! Full-state projection sent to viewers and returned by `GET /state`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::tournament::{
    Challenge, Match, MatchScore, MatchStatus, Settings, SlotOutcome, Team, Theme,
    TournamentState,
};

/// Match as seen by clients, with slot teams expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub id: String,
    pub label: Option<String>,
    pub team_a: Option<Team>,
    pub team_b: Option<Team>,
    pub winner_id: Option<String>,
    pub loser_id: Option<String>,
    pub score: MatchScore,
    pub status: MatchStatus,
    pub current_challenge: Option<Challenge>,
    pub active_theme: Option<Theme>,
    #[serde(default)]
    pub disabled_themes: Vec<Theme>,
    #[serde(default)]
    pub used_challenge_ids: Vec<String>,
    pub source_a: Option<String>,
    pub source_b: Option<String>,
    #[serde(default)]
    pub source_outcome: SlotOutcome,
}

impl MatchSnapshot {
    /// Project `game`, resolving its slot ids against the leaderboard.
    pub fn project(game: &Match, state: &TournamentState) -> Self {
        let team = |slot: &Option<String>| {
            slot.as_deref()
                .and_then(|id| state.find_team(id))
                .cloned()
        };
        Self {
            id: game.id.clone(),
            label: game.label.clone(),
            team_a: team(&game.team_a),
            team_b: team(&game.team_b),
            winner_id: game.winner_id.clone(),
            loser_id: game.loser_id.clone(),
            score: game.score,
            status: game.status,
            current_challenge: game.current_challenge.clone(),
            active_theme: game.active_theme,
            disabled_themes: game.disabled_themes.clone(),
            used_challenge_ids: game.used_challenge_ids.clone(),
            source_a: game.source_a.clone(),
            source_b: game.source_b.clone(),
            source_outcome: game.source_outcome,
        }
    }

    /// Both teams are known.
    pub fn is_ready(&self) -> bool {
        self.team_a.is_some() && self.team_b.is_some()
    }
}

/// Everything a screen needs to render the tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSnapshot {
    pub bracket: Vec<MatchSnapshot>,
    pub leaderboard: Vec<Team>,
    pub settings: Settings,
    pub current_match_id: Option<String>,
    #[serde(default)]
    pub global_used_challenge_ids: Vec<String>,
    pub final_match_id: String,
    pub third_place_match_id: Option<String>,
    /// Final and third-place match are both completed.
    #[serde(default)]
    pub complete: bool,
    /// Winner of the final.
    pub champion_id: Option<String>,
}

impl From<&TournamentState> for TournamentSnapshot {
    fn from(state: &TournamentState) -> Self {
        Self {
            bracket: state
                .bracket
                .iter()
                .map(|game| MatchSnapshot::project(game, state))
                .collect(),
            leaderboard: state.leaderboard.clone(),
            settings: state.settings,
            current_match_id: state.current_match_id.clone(),
            global_used_challenge_ids: state.global_used_challenge_ids.clone(),
            final_match_id: state.final_match_id.clone(),
            third_place_match_id: state.third_place_match_id.clone(),
            complete: state.is_complete(),
            champion_id: state.champion().map(|team| team.id.clone()),
        }
    }
}

impl TournamentSnapshot {
    /// Look up a match by id.
    pub fn find_match(&self, match_id: &str) -> Option<&MatchSnapshot> {
        self.bracket.iter().find(|game| game.id == match_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::bracket::BracketTopology;

    #[test]
    fn snapshot_expands_slot_teams_and_uses_camel_case() {
        let teams = (1..=8)
            .map(|i| Team::new(format!("t{i}"), format!("Team {i}"), vec!["Ana".into()]))
            .collect();
        let state = BracketTopology::eight_teams()
            .seed(teams, Settings::default())
            .unwrap();

        let snapshot = TournamentSnapshot::from(&state);
        let g1 = snapshot.find_match("g1").unwrap();
        assert_eq!(g1.team_a.as_ref().map(|t| t.name.as_str()), Some("Team 1"));
        assert!(!snapshot.complete);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["bracket"][0]["teamB"]["id"], "t2");
        assert_eq!(json["bracket"][0]["score"]["bestOf"], 5);
        assert_eq!(json["bracket"][4]["teamA"], serde_json::Value::Null);
        assert_eq!(json["settings"]["scoring"]["winBonus"], 2);
        assert_eq!(json["thirdPlaceMatchId"], "third");
    }
}
