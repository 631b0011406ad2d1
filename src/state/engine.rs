//! Command processing over the canonical [`TournamentState`].
//!
//! The engine is cheap to clone so the application layer can run each command on a
//! draft copy and only commit it once the command succeeded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dao::content::ContentLibrary,
    state::{
        bracket::{BracketTopology, TopologyError},
        state_machine::{InvalidTransition, MatchEvent, compute_transition},
        tournament::{
            Challenge, Match, MatchId, MatchScore, MatchStatus, RoundResult, Settings, Side, Team,
            TeamId, Theme, TournamentState,
        },
    },
};

/// Domain errors raised by bracket commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketError {
    /// No match with this id.
    #[error("match `{0}` not found")]
    MatchNotFound(MatchId),
    /// No team with this id.
    #[error("team `{0}` not found")]
    TeamNotFound(TeamId),
    /// The match still waits for an upstream result.
    #[error("match `{0}` cannot be played before both teams are known")]
    UnresolvedSlots(MatchId),
    /// Another match is already on screen.
    #[error("match `{0}` is already in progress")]
    MatchInProgress(MatchId),
    /// The command needs the match to be in progress.
    #[error("match `{0}` is not in progress")]
    NotInProgress(MatchId),
    /// Lifecycle violation.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// No content to draw from.
    #[error("no challenges available for theme `{0}`")]
    EmptyPool(Theme),
    /// The declared winner does not play in the match.
    #[error("team `{team_id}` does not play in match `{match_id}`")]
    InvalidWinner {
        /// Match being advanced.
        match_id: MatchId,
        /// Rejected team.
        team_id: TeamId,
    },
    /// The roster cannot fill the bracket.
    #[error("{required} teams are needed to seed the bracket, got {supplied}")]
    NotEnoughTeams {
        /// Teams needed.
        required: usize,
        /// Teams supplied.
        supplied: usize,
    },
    /// Two teams share an id.
    #[error("duplicate team id `{0}`")]
    DuplicateTeam(TeamId),
    /// Removing the team would orphan a bracket slot.
    #[error("team `{0}` is placed in the bracket and cannot be removed")]
    TeamInUse(TeamId),
    /// Bracket wiring is invalid.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Result alias for engine commands.
pub type BracketResult<T> = Result<T, BracketError>;

/// What happened after a scored round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The match goes on.
    Continue,
    /// Scheduled rounds ran out on a tie; one more round is added.
    SuddenDeath,
    /// The given side won.
    Winner(Side),
}

/// Decide whether a match is over after `score.current_challenge` rounds.
///
/// With `clinch_early`, a lead larger than the points still available ends the match.
/// Otherwise the leader wins once every scheduled round is played, and a tie at that
/// point calls for sudden death.
pub fn check_winner(score: &MatchScore, per_correct: u32, clinch_early: bool) -> Resolution {
    let lead = score.team_a.abs_diff(score.team_b);
    let leader = if score.team_a > score.team_b {
        Side::A
    } else {
        Side::B
    };
    let remaining = score.remaining();

    if clinch_early && lead > remaining.saturating_mul(per_correct) {
        return Resolution::Winner(leader);
    }
    if remaining == 0 {
        if lead > 0 {
            return Resolution::Winner(leader);
        }
        return Resolution::SuddenDeath;
    }
    Resolution::Continue
}

/// Outcome of a scoring command.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// The match after the round.
    pub game: Match,
    /// Whether the round decided the match.
    pub resolved: bool,
}

/// Owner of the tournament state and the rules applied to it.
#[derive(Debug, Clone)]
pub struct BracketEngine {
    state: TournamentState,
    topology: BracketTopology,
    seed_teams: Vec<Team>,
    content: Arc<ContentLibrary>,
    rng: StdRng,
}

impl BracketEngine {
    /// Seed a fresh tournament from `topology`.
    pub fn new(
        topology: BracketTopology,
        teams: Vec<Team>,
        settings: Settings,
        content: Arc<ContentLibrary>,
    ) -> BracketResult<Self> {
        topology.validate()?;
        ensure_unique_ids(&teams)?;
        let state = seed(&topology, teams.clone(), settings)?;
        Ok(Self {
            state,
            topology,
            seed_teams: teams,
            content,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Resume a previously persisted tournament. Its bracket wiring is kept for resets.
    pub fn restore(
        state: TournamentState,
        seed_teams: Vec<Team>,
        content: Arc<ContentLibrary>,
    ) -> BracketResult<Self> {
        let topology = BracketTopology::from_state(&state);
        topology.validate()?;
        Ok(Self {
            state,
            topology,
            seed_teams,
            content,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Replace the random source, mostly for deterministic tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Canonical state.
    pub fn state(&self) -> &TournamentState {
        &self.state
    }

    /// Bracket wiring used for resets.
    pub fn topology(&self) -> &BracketTopology {
        &self.topology
    }

    // ---------------------------------------------------------------------------
    // Match lifecycle
    // ---------------------------------------------------------------------------

    /// Put a match on screen and draw its first challenge.
    pub fn start_match(&mut self, match_id: &str) -> BracketResult<Match> {
        let idx = self.index_of(match_id)?;
        self.fill_slots(idx);

        let current = &self.state.bracket[idx];
        if current.status == MatchStatus::InProgress {
            debug!(match_id, "match already in progress; making it current");
            self.state.current_match_id = Some(current.id.clone());
            return Ok(current.clone());
        }

        let next = compute_transition(current.status, MatchEvent::Start)?;
        if !current.is_ready() {
            return Err(BracketError::UnresolvedSlots(current.id.clone()));
        }
        if let Some(other) = self.state.in_progress_match() {
            return Err(BracketError::MatchInProgress(other.id.clone()));
        }

        let game = &mut self.state.bracket[idx];
        game.status = next;
        self.state.current_match_id = Some(game.id.clone());

        let theme = self.pick_random_theme(idx, None);
        self.draw_challenge(idx, theme)?;
        Ok(self.state.bracket[idx].clone())
    }

    /// Roll a match back to its initial pending state.
    ///
    /// A completed match also gives back its win bonus and vacates the slots it fed;
    /// downstream matches that already used those slots are rolled back as well.
    pub fn reset_match(&mut self, match_id: &str) -> BracketResult<Match> {
        let idx = self.index_of(match_id)?;
        let was_completed = self.state.bracket[idx].status == MatchStatus::Completed;
        self.clear_match(idx, false);
        if was_completed {
            self.vacate_downstream(match_id);
        }
        Ok(self.state.bracket[idx].clone())
    }

    /// Drop the challenge on screen so it can be drawn again.
    pub fn reset_round(&mut self, match_id: &str) -> BracketResult<Match> {
        let idx = self.index_of(match_id)?;
        let game = &mut self.state.bracket[idx];
        if let Some(challenge) = game.current_challenge.take() {
            remove_last(&mut game.used_challenge_ids, &challenge.id);
            remove_last(&mut self.state.global_used_challenge_ids, &challenge.id);
        }
        Ok(game.clone())
    }

    /// Rebuild the whole bracket. Leaderboard and challenge usage start over.
    pub fn reset_tournament(
        &mut self,
        teams: Option<Vec<Team>>,
        settings: Option<Settings>,
    ) -> BracketResult<()> {
        let teams = teams.unwrap_or_else(|| self.seed_teams.clone());
        ensure_unique_ids(&teams)?;
        let settings = settings.unwrap_or(self.state.settings);
        self.state = seed(&self.topology, teams, settings)?;
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Challenges
    // ---------------------------------------------------------------------------

    /// Update the disabled themes and draw a challenge of `theme`, or of a new random
    /// enabled theme when none is given.
    pub fn set_theme(
        &mut self,
        match_id: &str,
        theme: Option<Theme>,
        disabled: Option<Vec<Theme>>,
    ) -> BracketResult<Challenge> {
        let idx = self.in_progress_index(match_id)?;
        if let Some(disabled) = disabled {
            self.state.bracket[idx].disabled_themes = disabled;
        }
        let theme = match theme {
            Some(theme) => theme,
            None => {
                let active = self.state.bracket[idx].active_theme;
                self.pick_random_theme(idx, active)
            }
        };
        self.draw_challenge(idx, theme)
    }

    /// Replace the challenge on screen without scoring a round.
    pub fn next_challenge(&mut self, match_id: &str) -> BracketResult<Challenge> {
        let idx = self.in_progress_index(match_id)?;
        let active = self.state.bracket[idx].active_theme;
        let theme = self.pick_random_theme(idx, active);
        self.draw_challenge(idx, theme)
    }

    // ---------------------------------------------------------------------------
    // Scoring
    // ---------------------------------------------------------------------------

    /// Score a round answered by both teams.
    pub fn submit_round(
        &mut self,
        match_id: &str,
        result_a: RoundResult,
        result_b: RoundResult,
    ) -> BracketResult<RoundOutcome> {
        self.score_round(match_id, &[(Side::A, result_a), (Side::B, result_b)])
    }

    /// Score a round for a single side.
    pub fn submit_challenge(
        &mut self,
        match_id: &str,
        side: Side,
        result: RoundResult,
    ) -> BracketResult<RoundOutcome> {
        self.score_round(match_id, &[(side, result)])
    }

    /// Declare the winner of a match by hand.
    pub fn advance(&mut self, match_id: &str, winner_id: &str) -> BracketResult<Match> {
        let idx = self.index_of(match_id)?;
        self.fill_slots(idx);

        let game = &self.state.bracket[idx];
        if !game.is_ready() {
            return Err(BracketError::UnresolvedSlots(game.id.clone()));
        }
        let side = game
            .side_of(winner_id)
            .ok_or_else(|| BracketError::InvalidWinner {
                match_id: game.id.clone(),
                team_id: winner_id.to_string(),
            })?;

        if game.status == MatchStatus::Pending {
            let next = compute_transition(game.status, MatchEvent::Start)?;
            self.state.bracket[idx].status = next;
        }
        self.complete(idx, side)?;
        Ok(self.state.bracket[idx].clone())
    }

    /// Overwrite the raw match tally and nudge leaderboard scores.
    ///
    /// Round bookkeeping is untouched and the match is never resolved by this command.
    pub fn override_score(
        &mut self,
        match_id: &str,
        team_a: Option<u32>,
        team_b: Option<u32>,
        leaderboard_delta: Option<HashMap<TeamId, i32>>,
    ) -> BracketResult<Match> {
        let idx = self.index_of(match_id)?;
        if let Some(deltas) = &leaderboard_delta {
            if let Some(unknown) = deltas.keys().find(|id| self.state.find_team(id).is_none()) {
                return Err(BracketError::TeamNotFound(unknown.clone()));
            }
        }

        let game = &mut self.state.bracket[idx];
        if let Some(points) = team_a {
            game.score.team_a = points;
        }
        if let Some(points) = team_b {
            game.score.team_b = points;
        }
        for (team_id, delta) in leaderboard_delta.into_iter().flatten() {
            if let Some(team) = self.state.team_mut(&team_id) {
                team.adjust_score(delta);
            }
        }
        Ok(self.state.bracket[idx].clone())
    }

    // ---------------------------------------------------------------------------
    // Roster
    // ---------------------------------------------------------------------------

    /// Replace the roster, keeping leaderboard scores of teams that stay.
    pub fn set_teams(&mut self, teams: Vec<Team>) -> BracketResult<()> {
        ensure_unique_ids(&teams)?;
        let required = self.topology.seed_capacity();
        if teams.len() < required {
            return Err(BracketError::NotEnoughTeams {
                required,
                supplied: teams.len(),
            });
        }

        let incoming: HashSet<&str> = teams.iter().map(|t| t.id.as_str()).collect();
        for team in &self.state.leaderboard {
            if !incoming.contains(team.id.as_str())
                && self.state.bracket.iter().any(|m| m.references_team(&team.id))
            {
                return Err(BracketError::TeamInUse(team.id.clone()));
            }
        }

        let scores: HashMap<&str, u32> = self
            .state
            .leaderboard
            .iter()
            .map(|t| (t.id.as_str(), t.score))
            .collect();
        let leaderboard = teams
            .into_iter()
            .map(|team| {
                let score = scores.get(team.id.as_str()).copied().unwrap_or(0);
                Team { score, ..team }
            })
            .collect();
        self.state.leaderboard = leaderboard;
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------

    fn index_of(&self, match_id: &str) -> BracketResult<usize> {
        self.state
            .match_index(match_id)
            .ok_or_else(|| BracketError::MatchNotFound(match_id.to_string()))
    }

    fn in_progress_index(&self, match_id: &str) -> BracketResult<usize> {
        let idx = self.index_of(match_id)?;
        if self.state.bracket[idx].status != MatchStatus::InProgress {
            return Err(BracketError::NotInProgress(match_id.to_string()));
        }
        Ok(idx)
    }

    fn score_round(
        &mut self,
        match_id: &str,
        results: &[(Side, RoundResult)],
    ) -> BracketResult<RoundOutcome> {
        let idx = self.in_progress_index(match_id)?;
        let Settings {
            scoring,
            clinch_early,
            ..
        } = self.state.settings;

        let game = &mut self.state.bracket[idx];
        for (side, result) in results {
            if result.is_correct() {
                game.score.award(*side, scoring.per_correct);
            }
        }
        game.score.current_challenge += 1;
        if game.score.current_challenge > game.score.best_of {
            game.score.best_of = game.score.current_challenge;
        }

        let resolution = check_winner(&game.score, scoring.per_correct, clinch_early);
        debug!(match_id, ?resolution, score = ?game.score, "round scored");
        match resolution {
            Resolution::Winner(side) => {
                self.complete(idx, side)?;
            }
            Resolution::SuddenDeath => {
                game.score.best_of += 1;
                let active = game.active_theme;
                let theme = self.pick_random_theme(idx, active);
                self.draw_challenge(idx, theme)?;
            }
            Resolution::Continue => {
                let active = game.active_theme;
                let theme = self.pick_random_theme(idx, active);
                self.draw_challenge(idx, theme)?;
            }
        }

        Ok(RoundOutcome {
            game: self.state.bracket[idx].clone(),
            resolved: matches!(resolution, Resolution::Winner(_)),
        })
    }

    /// Mark the match won by `side`, award the bonus and feed downstream matches.
    fn complete(&mut self, idx: usize, side: Side) -> BracketResult<()> {
        let win_bonus = self.state.settings.scoring.win_bonus;
        let game = &mut self.state.bracket[idx];
        let next = compute_transition(game.status, MatchEvent::Resolve)?;
        let (Some(winner), Some(loser)) =
            (game.slot(side).cloned(), game.slot(side.other()).cloned())
        else {
            return Err(BracketError::UnresolvedSlots(game.id.clone()));
        };

        game.status = next;
        game.winner_id = Some(winner.clone());
        game.loser_id = Some(loser);
        game.current_challenge = None;
        let match_id = game.id.clone();

        if self.state.current_match_id.as_deref() == Some(match_id.as_str()) {
            self.state.current_match_id = None;
        }
        if let Some(team) = self.state.team_mut(&winner) {
            team.score = team.score.saturating_add(win_bonus);
        }

        for downstream in 0..self.state.bracket.len() {
            if self.state.bracket[downstream].is_fed_by(&match_id) {
                self.fill_slots(downstream);
            }
        }
        Ok(())
    }

    /// Populate both slots of a fed match once all of its sources are decided.
    fn fill_slots(&mut self, idx: usize) {
        let game = &self.state.bracket[idx];
        let (Some(source_a), Some(source_b)) = (&game.source_a, &game.source_b) else {
            return;
        };
        let outcome = game.source_outcome;
        let resolve = |source: &str| {
            self.state
                .find_match(source)
                .filter(|m| m.status == MatchStatus::Completed)
                .and_then(|m| m.outcome(outcome))
                .cloned()
        };
        let (Some(team_a), Some(team_b)) = (resolve(source_a), resolve(source_b)) else {
            return;
        };

        let game = &mut self.state.bracket[idx];
        if game.team_a.as_ref() != Some(&team_a) || game.team_b.as_ref() != Some(&team_b) {
            debug!(match_id = %game.id, %team_a, %team_b, "downstream slots populated");
        }
        game.team_a = Some(team_a);
        game.team_b = Some(team_b);
    }

    /// Restore the initial state of a match, optionally emptying fed slots too.
    fn clear_match(&mut self, idx: usize, clear_slots: bool) {
        let best_of = self.state.settings.best_of;
        let win_bonus = self.state.settings.scoring.win_bonus;
        let game = &mut self.state.bracket[idx];

        let winner = game.winner_id.take();
        game.loser_id = None;
        game.status =
            compute_transition(game.status, MatchEvent::Reset).unwrap_or(MatchStatus::Pending);
        game.score = MatchScore::new(best_of);
        game.current_challenge = None;
        game.active_theme = None;
        game.used_challenge_ids.clear();
        if clear_slots && game.source_a.is_some() {
            game.team_a = None;
            game.team_b = None;
        }
        let match_id = game.id.clone();

        if let Some(team) = winner.and_then(|id| self.state.team_mut(&id)) {
            team.adjust_score(-(win_bonus as i32));
        }
        if self.state.current_match_id.as_deref() == Some(match_id.as_str()) {
            self.state.current_match_id = None;
        }
    }

    fn vacate_downstream(&mut self, match_id: &str) {
        let fed: Vec<usize> = self
            .state
            .bracket
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_fed_by(match_id))
            .map(|(idx, _)| idx)
            .collect();

        for idx in fed {
            let downstream = &self.state.bracket[idx];
            let id = downstream.id.clone();
            let progressed = downstream.status == MatchStatus::Completed;
            if downstream.status != MatchStatus::Pending {
                warn!(match_id = %id, "upstream result withdrawn; rolling back downstream match");
            }
            self.clear_match(idx, true);
            if progressed {
                self.vacate_downstream(&id);
            }
        }
    }

    /// Random theme among the usable ones, avoiding `exclude` when there is a choice.
    fn pick_random_theme(&mut self, idx: usize, exclude: Option<Theme>) -> Theme {
        let disabled = &self.state.bracket[idx].disabled_themes;
        let available: Vec<Theme> = match self.content.themes().collect::<Vec<_>>() {
            themes if themes.is_empty() => Theme::ALL.to_vec(),
            themes => themes,
        };
        let mut usable: Vec<Theme> = available
            .iter()
            .copied()
            .filter(|theme| !disabled.contains(theme))
            .collect();
        if usable.is_empty() {
            usable = available;
        }
        if let Some(exclude) = exclude {
            if usable.len() > 1 {
                usable.retain(|theme| *theme != exclude);
            }
        }
        usable
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Theme::Trivia)
    }

    /// Draw an unused challenge of `theme` and put it on screen.
    fn draw_challenge(&mut self, idx: usize, theme: Theme) -> BracketResult<Challenge> {
        let content = Arc::clone(&self.content);
        let pool = content.pool(theme);
        if pool.is_empty() {
            return Err(BracketError::EmptyPool(theme));
        }

        let used: HashSet<&str> = self
            .state
            .global_used_challenge_ids
            .iter()
            .map(String::as_str)
            .collect();
        let fresh: Vec<&Challenge> = pool
            .iter()
            .filter(|challenge| !used.contains(challenge.id.as_str()))
            .collect();

        let picked = if fresh.is_empty() {
            warn!(%theme, "challenge pool exhausted; allowing repeats");
            pool.choose(&mut self.rng)
        } else {
            fresh.choose(&mut self.rng).copied()
        };
        let challenge = picked.cloned().ok_or(BracketError::EmptyPool(theme))?;

        let game = &mut self.state.bracket[idx];
        game.used_challenge_ids.push(challenge.id.clone());
        game.current_challenge = Some(challenge.clone());
        game.active_theme = Some(theme);
        self.state
            .global_used_challenge_ids
            .push(challenge.id.clone());
        Ok(challenge)
    }
}

fn seed(
    topology: &BracketTopology,
    teams: Vec<Team>,
    settings: Settings,
) -> BracketResult<TournamentState> {
    let supplied = teams.len();
    topology
        .seed(teams, settings)
        .ok_or(BracketError::NotEnoughTeams {
            required: topology.seed_capacity(),
            supplied,
        })
}

fn ensure_unique_ids(teams: &[Team]) -> BracketResult<()> {
    let mut seen = HashSet::with_capacity(teams.len());
    for team in teams {
        if !seen.insert(team.id.as_str()) {
            return Err(BracketError::DuplicateTeam(team.id.clone()));
        }
    }
    Ok(())
}

fn remove_last(ids: &mut Vec<String>, id: &str) {
    if let Some(pos) = ids.iter().rposition(|candidate| candidate == id) {
        ids.remove(pos);
    }
}
