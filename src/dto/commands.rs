//! Request and response bodies of the host command endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::{
        snapshot::MatchSnapshot,
        validation::{validate_identifier, validate_settings, validate_sfx_event},
    },
    state::tournament::{RoundResult, Settings, Side, Team, Theme},
};

/// Body of every command that only targets a match.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchCommand {
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
}

/// Pick the theme of the next challenge.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ThemeRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
    /// Theme to draw from; a random enabled theme when omitted.
    #[serde(default)]
    pub theme: Option<Theme>,
    /// Replaces the set of themes excluded from random selection.
    #[serde(default)]
    pub disabled: Option<Vec<Theme>>,
}

/// Score one side of the current round.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitChallengeRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
    pub team: Side,
    pub result: RoundResult,
}

/// Score both sides of the current round.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRoundRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
    pub team_a: RoundResult,
    pub team_b: RoundResult,
}

/// Declare a winner by hand.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
    #[validate(custom(function = "validate_identifier"))]
    pub winner_id: String,
}

/// Manual correction of a match tally and of leaderboard scores.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OverrideScoreRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub match_id: String,
    #[serde(default)]
    pub team_a_score: Option<u32>,
    #[serde(default)]
    pub team_b_score: Option<u32>,
    /// Signed adjustment per team id; results are clamped at zero.
    #[serde(default)]
    pub leaderboard_delta: Option<HashMap<String, i32>>,
}

/// Roster entry; teams without an id get a fresh one.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamInput {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub players: Vec<String>,
}

impl Validate for TeamInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ref id) = self.id {
            if let Err(e) = validate_identifier(id) {
                errors.add("id", e);
            }
        }

        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > 64 {
            let mut err = ValidationError::new("team_name");
            err.message = Some("Team name must be between 1 and 64 characters".into());
            errors.add("name", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<TeamInput> for Team {
    fn from(value: TeamInput) -> Self {
        let id = value.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        Team::new(id, value.name.trim(), value.players)
    }
}

/// Replacement roster posted to `/teams`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SetTeamsRequest(pub Vec<TeamInput>);

impl Validate for SetTeamsRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_roster(&self.0)
    }
}

/// Destructive tournament reset.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetTournamentRequest {
    /// Seed roster; the configured teams when omitted.
    #[serde(default)]
    pub teams: Option<Vec<TeamInput>>,
    /// New settings; the current ones when omitted.
    #[serde(default)]
    pub settings: Option<Settings>,
    /// Must be `true`: the reset wipes every result.
    #[serde(default)]
    pub confirm: bool,
}

impl Validate for ResetTournamentRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.teams.as_deref().map(validate_roster) {
            Some(Err(roster_errors)) => roster_errors,
            _ => ValidationErrors::new(),
        };

        if !self.confirm {
            let mut err = ValidationError::new("confirm_required");
            err.message = Some("Tournament reset must be confirmed".into());
            errors.add("confirm", err);
        }

        if let Some(settings) = &self.settings {
            if let Err(err) = validate_settings(settings) {
                errors.add("settings", err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Broadcast a sound cue to every screen.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SfxRequest {
    #[validate(custom(function = "validate_sfx_event"))]
    pub event: String,
}

/// Result of a scoring command.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundResponse {
    #[serde(rename = "match")]
    pub game: MatchSnapshot,
    /// The round decided the match.
    pub resolved: bool,
}

/// Pretty-printed dump of the tournament.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    /// JSON text of the full snapshot.
    pub state: String,
    pub exported_at: String,
}

/// Generic action acknowledgement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

fn validate_roster(teams: &[TeamInput]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for team in teams {
        if let Err(team_errors) = team.validate() {
            errors.merge_self("teams", Err(team_errors));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_requires_confirmation() {
        let request: ResetTournamentRequest = serde_json::from_str("{}").unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm"));

        let request: ResetTournamentRequest =
            serde_json::from_str(r#"{"confirm": true}"#).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn reset_rejects_zero_rounds() {
        let request: ResetTournamentRequest =
            serde_json::from_str(r#"{"confirm": true, "settings": {"bestOf": 0}}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn team_input_requires_a_name() {
        let input = TeamInput {
            id: None,
            name: "  ".into(),
            players: vec![],
        };
        assert!(input.validate().is_err());
        let roster = SetTeamsRequest(vec![input]);
        assert!(roster.validate().is_err());
    }

    #[test]
    fn team_input_without_id_gets_one() {
        let team = Team::from(TeamInput {
            id: None,
            name: " Samia & Rafay ".into(),
            players: vec!["Samia".into(), "Rafay".into()],
        });
        assert!(Uuid::parse_str(&team.id).is_ok());
        assert_eq!(team.name, "Samia & Rafay");
        assert_eq!(team.score, 0);
    }

    #[test]
    fn submit_round_uses_wire_names() {
        let request: SubmitRoundRequest =
            serde_json::from_str(r#"{"matchId":"g1","teamA":"correct","teamB":"timeout"}"#)
                .unwrap();
        assert_eq!(request.team_a, RoundResult::Correct);
        assert_eq!(request.team_b, RoundResult::Timeout);

        let request: SubmitChallengeRequest =
            serde_json::from_str(r#"{"matchId":"g1","team":"B","result":"wrong"}"#).unwrap();
        assert_eq!(request.team, Side::B);
    }

    #[test]
    fn blank_match_id_is_rejected() {
        let command = MatchCommand {
            match_id: " ".into(),
        };
        assert!(command.validate().is_err());
    }
}
