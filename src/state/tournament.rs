//! In-memory tournament model: teams, matches, challenges and settings.
//!
//! Leaf value types (themes, challenges, scores, settings) carry their serde and
//! schema derives so they can be shared by the persistence and DTO layers; the
//! aggregate [`Match`] and [`TournamentState`] types are projected explicitly.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a team in the roster.
pub type TeamId = String;
/// Identifier of a match in the bracket.
pub type MatchId = String;

/// Category of challenge content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Finish or identify song lyrics.
    Lyrics,
    /// Identify a movie or TV scene.
    Scene,
    /// Decode an emoji sequence.
    Emoji,
    /// General trivia question.
    Trivia,
}

impl Theme {
    /// Every theme, in display order.
    pub const ALL: [Theme; 4] = [Theme::Lyrics, Theme::Scene, Theme::Emoji, Theme::Trivia];

    /// Lowercase wire name of the theme.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Lyrics => "lyrics",
            Theme::Scene => "scene",
            Theme::Emoji => "emoji",
            Theme::Trivia => "trivia",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contestant pair competing together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Team {
    /// Stable identifier.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Names of the people playing for this team.
    #[serde(default)]
    pub players: Vec<String>,
    /// Cumulative leaderboard score, never negative.
    #[serde(default)]
    pub score: u32,
}

impl Team {
    /// Build a team with a zero leaderboard score.
    pub fn new(id: impl Into<TeamId>, name: impl Into<String>, players: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            players,
            score: 0,
        }
    }

    /// Apply a signed delta to the leaderboard score, clamping at zero.
    pub fn adjust_score(&mut self, delta: i32) {
        self.score = self.score.saturating_add_signed(delta);
    }
}

/// A single prompt drawn during a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Challenge {
    /// Identifier, unique across every theme pool.
    pub id: String,
    /// Theme pool the challenge belongs to.
    pub theme: Theme,
    /// Text shown to the teams.
    pub prompt: String,
    /// Expected answer, shown to the host.
    pub answer: String,
    /// Free-form extras such as hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Per-match tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    /// Points earned by the team in slot A.
    pub team_a: u32,
    /// Points earned by the team in slot B.
    pub team_b: u32,
    /// Number of rounds scheduled (extended by sudden death).
    pub best_of: u32,
    /// Rounds played so far.
    pub current_challenge: u32,
}

impl MatchScore {
    /// Zeroed score for a match of `best_of` rounds.
    pub fn new(best_of: u32) -> Self {
        Self {
            team_a: 0,
            team_b: 0,
            best_of,
            current_challenge: 0,
        }
    }

    fn points_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::A => &mut self.team_a,
            Side::B => &mut self.team_b,
        }
    }

    /// Award `points` to `side`.
    pub fn award(&mut self, side: Side, points: u32) {
        let slot = self.points_mut(side);
        *slot = slot.saturating_add(points);
    }

    /// Rounds left before the scheduled end of the match.
    pub fn remaining(&self) -> u32 {
        self.best_of.saturating_sub(self.current_challenge)
    }
}

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting to be played.
    Pending,
    /// Currently being played.
    InProgress,
    /// Winner decided.
    Completed,
}

/// Which outcome of the source matches feeds a downstream match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlotOutcome {
    /// The winners of the source matches advance.
    #[default]
    Winner,
    /// The losers of the source matches advance (third-place match).
    Loser,
}

/// One of the two slots of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Side {
    /// First slot.
    A,
    /// Second slot.
    B,
}

impl Side {
    /// The opposing slot.
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Outcome of one side's answer in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundResult {
    /// Answered correctly.
    Correct,
    /// Answered incorrectly.
    Wrong,
    /// Ran out of time.
    Timeout,
}

impl RoundResult {
    /// Whether this result earns points.
    pub fn is_correct(self) -> bool {
        matches!(self, RoundResult::Correct)
    }
}

/// Countdown duration per theme, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ThemeTimers {
    /// Lyrics rounds.
    pub lyrics: u32,
    /// Scene rounds.
    pub scene: u32,
    /// Emoji rounds.
    pub emoji: u32,
    /// Trivia rounds.
    pub trivia: u32,
}

impl ThemeTimers {
    /// Seconds allotted to the given theme.
    pub fn seconds(&self, theme: Theme) -> u32 {
        match theme {
            Theme::Lyrics => self.lyrics,
            Theme::Scene => self.scene,
            Theme::Emoji => self.emoji,
            Theme::Trivia => self.trivia,
        }
    }
}

impl Default for ThemeTimers {
    fn default() -> Self {
        Self {
            lyrics: 10,
            scene: 15,
            emoji: 25,
            trivia: 15,
        }
    }
}

/// Points awarded per round and per match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoringSettings {
    /// Match points for a correct answer.
    pub per_correct: u32,
    /// Leaderboard points for winning a match.
    pub win_bonus: u32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            per_correct: 1,
            win_bonus: 2,
        }
    }
}

/// Tournament-wide configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Countdown per theme.
    #[serde(default)]
    pub timers: ThemeTimers,
    /// Scoring rules.
    #[serde(default)]
    pub scoring: ScoringSettings,
    /// Rounds scheduled for every match.
    #[serde(default = "default_best_of")]
    pub best_of: u32,
    /// Whether a mathematically decided match ends before all rounds are played.
    #[serde(default = "default_clinch_early")]
    pub clinch_early: bool,
}

fn default_best_of() -> u32 {
    5
}

fn default_clinch_early() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timers: ThemeTimers::default(),
            scoring: ScoringSettings::default(),
            best_of: default_best_of(),
            clinch_early: default_clinch_early(),
        }
    }
}

/// A pairing of two teams within the bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Stable identifier.
    pub id: MatchId,
    /// Display label such as "Semifinal 1".
    pub label: Option<String>,
    /// Team in slot A, once known.
    pub team_a: Option<TeamId>,
    /// Team in slot B, once known.
    pub team_b: Option<TeamId>,
    /// Match feeding slot A.
    pub source_a: Option<MatchId>,
    /// Match feeding slot B.
    pub source_b: Option<MatchId>,
    /// Which outcome of the sources advances into this match.
    pub source_outcome: SlotOutcome,
    /// Winner, once completed.
    pub winner_id: Option<TeamId>,
    /// Loser, once completed.
    pub loser_id: Option<TeamId>,
    /// Per-match tally.
    pub score: MatchScore,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Challenge currently on screen.
    pub current_challenge: Option<Challenge>,
    /// Theme of the current challenge.
    pub active_theme: Option<Theme>,
    /// Themes the host excluded from random selection.
    pub disabled_themes: Vec<Theme>,
    /// Challenges drawn during this match, oldest first.
    pub used_challenge_ids: Vec<String>,
}

impl Match {
    /// Build a pending match with empty slots.
    pub fn new(id: impl Into<MatchId>, best_of: u32) -> Self {
        Self {
            id: id.into(),
            label: None,
            team_a: None,
            team_b: None,
            source_a: None,
            source_b: None,
            source_outcome: SlotOutcome::Winner,
            winner_id: None,
            loser_id: None,
            score: MatchScore::new(best_of),
            status: MatchStatus::Pending,
            current_challenge: None,
            active_theme: None,
            disabled_themes: Vec::new(),
            used_challenge_ids: Vec::new(),
        }
    }

    /// Team occupying `side`.
    pub fn slot(&self, side: Side) -> Option<&TeamId> {
        match side {
            Side::A => self.team_a.as_ref(),
            Side::B => self.team_b.as_ref(),
        }
    }

    /// Side occupied by `team_id`, if it plays in this match.
    pub fn side_of(&self, team_id: &str) -> Option<Side> {
        if self.team_a.as_deref() == Some(team_id) {
            Some(Side::A)
        } else if self.team_b.as_deref() == Some(team_id) {
            Some(Side::B)
        } else {
            None
        }
    }

    /// Both slots are filled.
    pub fn is_ready(&self) -> bool {
        self.team_a.is_some() && self.team_b.is_some()
    }

    /// Whether `match_id` feeds one of this match's slots.
    pub fn is_fed_by(&self, match_id: &str) -> bool {
        self.source_a.as_deref() == Some(match_id) || self.source_b.as_deref() == Some(match_id)
    }

    /// Team advancing out of this match for the given outcome.
    pub fn outcome(&self, outcome: SlotOutcome) -> Option<&TeamId> {
        match outcome {
            SlotOutcome::Winner => self.winner_id.as_ref(),
            SlotOutcome::Loser => self.loser_id.as_ref(),
        }
    }

    /// Whether the team ids mentioned by this match include `team_id`.
    pub fn references_team(&self, team_id: &str) -> bool {
        [&self.team_a, &self.team_b, &self.winner_id, &self.loser_id]
            .into_iter()
            .any(|slot| slot.as_deref() == Some(team_id))
    }
}

/// Canonical state of the whole tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentState {
    /// Matches in bracket order.
    pub bracket: Vec<Match>,
    /// Teams with their cumulative scores.
    pub leaderboard: Vec<Team>,
    /// Tournament-wide configuration.
    pub settings: Settings,
    /// Match currently on screen.
    pub current_match_id: Option<MatchId>,
    /// Every challenge drawn since the last tournament reset.
    pub global_used_challenge_ids: Vec<String>,
    /// Match deciding the champion.
    pub final_match_id: MatchId,
    /// Match deciding third place, when the bracket has one.
    pub third_place_match_id: Option<MatchId>,
}

impl TournamentState {
    /// Look up a match by id.
    pub fn find_match(&self, match_id: &str) -> Option<&Match> {
        self.bracket.iter().find(|m| m.id == match_id)
    }

    /// Position of a match in the bracket.
    pub fn match_index(&self, match_id: &str) -> Option<usize> {
        self.bracket.iter().position(|m| m.id == match_id)
    }

    /// Look up a team by id.
    pub fn find_team(&self, team_id: &str) -> Option<&Team> {
        self.leaderboard.iter().find(|t| t.id == team_id)
    }

    /// Mutable access to a team by id.
    pub fn team_mut(&mut self, team_id: &str) -> Option<&mut Team> {
        self.leaderboard.iter_mut().find(|t| t.id == team_id)
    }

    /// The match currently being played, if any.
    pub fn in_progress_match(&self) -> Option<&Match> {
        self.bracket
            .iter()
            .find(|m| m.status == MatchStatus::InProgress)
    }

    /// The tournament is over once the final and the third-place match are completed.
    pub fn is_complete(&self) -> bool {
        let completed = |id: &str| {
            self.find_match(id)
                .is_some_and(|m| m.status == MatchStatus::Completed)
        };
        completed(&self.final_match_id)
            && self
                .third_place_match_id
                .as_deref()
                .is_none_or(completed)
    }

    /// Champion, once the final is decided.
    pub fn champion(&self) -> Option<&Team> {
        self.find_match(&self.final_match_id)
            .and_then(|m| m.winner_id.as_deref())
            .and_then(|id| self.find_team(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_score_clamps_at_zero() {
        let mut team = Team::new("t1", "Team", vec![]);
        team.adjust_score(3);
        team.adjust_score(-5);
        assert_eq!(team.score, 0);
    }

    #[test]
    fn theme_serializes_lowercase() {
        let json = serde_json::to_string(&Theme::Emoji).unwrap();
        assert_eq!(json, "\"emoji\"");
        let status = serde_json::to_string(&MatchStatus::InProgress).unwrap();
        assert_eq!(status, "\"in_progress\"");
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"bestOf": 3}"#).unwrap();
        assert_eq!(settings.best_of, 3);
        assert!(settings.clinch_early);
        assert_eq!(settings.scoring, ScoringSettings::default());
        assert_eq!(settings.timers.seconds(Theme::Emoji), 25);
    }

    #[test]
    fn side_lookup_matches_slots() {
        let mut m = Match::new("m1", 5);
        m.team_a = Some("a".into());
        m.team_b = Some("b".into());
        assert_eq!(m.side_of("a"), Some(Side::A));
        assert_eq!(m.side_of("b"), Some(Side::B));
        assert_eq!(m.side_of("c"), None);
        assert!(m.is_ready());
    }
}
