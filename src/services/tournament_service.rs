//! Business logic behind the host command routes. Every mutation goes through
//! [`AppState::run_announced_command`], which serialises commands, persists the result
//! and broadcasts the new snapshot followed by the informational messages built here.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{content::ContentLibrary, models::SCHEMA_VERSION, tournament_store::TournamentStore},
    dto::{
        commands::{
            OverrideScoreRequest, ResetTournamentRequest, RoundResponse, SetTeamsRequest,
            SubmitChallengeRequest, SubmitRoundRequest, ThemeRequest,
        },
        snapshot::{MatchSnapshot, TournamentSnapshot},
        ws::ServerMessage,
    },
    error::ServiceError,
    services::broadcast,
    state::{
        AppState, SharedState,
        engine::{BracketEngine, RoundOutcome},
        tournament::{Challenge, Match, Team},
    },
};

/// Restore the saved tournament or seed a fresh one, then build the shared state.
pub async fn bootstrap(
    config: Arc<AppConfig>,
    content: Arc<ContentLibrary>,
    store: Arc<dyn TournamentStore>,
) -> Result<SharedState, ServiceError> {
    let restored = match store.load().await {
        Ok(Some(document)) if document.schema_version != SCHEMA_VERSION => {
            warn!(
                found = document.schema_version,
                expected = SCHEMA_VERSION,
                "saved tournament uses another schema; seeding a fresh one"
            );
            None
        }
        Ok(Some(document)) => {
            match BracketEngine::restore(
                document.state.into(),
                config.teams().to_vec(),
                Arc::clone(&content),
            ) {
                Ok(engine) => {
                    info!(saved_at = %document.saved_at, "restored saved tournament");
                    Some(engine)
                }
                Err(err) => {
                    warn!(error = %err, "saved tournament is inconsistent; seeding a fresh one");
                    None
                }
            }
        }
        Ok(None) => {
            info!("no saved tournament; seeding a fresh one");
            None
        }
        Err(err) => {
            warn!(error = %err, "failed to load saved tournament; seeding a fresh one");
            None
        }
    };

    let fresh = restored.is_none();
    let engine = match restored {
        Some(engine) => engine,
        None => BracketEngine::new(
            config.topology().clone(),
            config.teams().to_vec(),
            config.settings(),
            content,
        )?,
    };

    let state = AppState::new(engine, store, config);
    if fresh {
        let engine = state.engine().await.clone();
        state.persist("seed", &engine).await;
    }
    Ok(state)
}

fn project(engine: &BracketEngine, game: &Match) -> MatchSnapshot {
    MatchSnapshot::project(game, engine.state())
}

/// Put a match on screen.
pub async fn start_match(
    state: &SharedState,
    match_id: &str,
) -> Result<MatchSnapshot, ServiceError> {
    let snapshot = state
        .run_announced_command("start_match", |engine| {
            let game = engine.start_match(match_id)?;
            let messages = vec![broadcast::match_start_message(&game)];
            Ok((project(engine, &game), messages))
        })
        .await?;

    info!(match_id, "match started");
    Ok(snapshot)
}

/// Draw a challenge of the requested (or a random) theme.
pub async fn set_theme(
    state: &SharedState,
    request: ThemeRequest,
) -> Result<Challenge, ServiceError> {
    let ThemeRequest {
        match_id,
        theme,
        disabled,
    } = request;
    let challenge = state
        .run_announced_command("set_theme", |engine| {
            let challenge = engine.set_theme(&match_id, theme, disabled)?;
            let messages = vec![broadcast::challenge_message(&match_id, &challenge)];
            Ok((challenge, messages))
        })
        .await?;

    info!(
        match_id = %match_id,
        theme = %challenge.theme,
        challenge_id = %challenge.id,
        "challenge drawn"
    );
    Ok(challenge)
}

/// Replace the challenge on screen without scoring.
pub async fn next_challenge(
    state: &SharedState,
    match_id: &str,
) -> Result<Challenge, ServiceError> {
    let challenge = state
        .run_announced_command("next_challenge", |engine| {
            let challenge = engine.next_challenge(match_id)?;
            let messages = vec![broadcast::challenge_message(match_id, &challenge)];
            Ok((challenge, messages))
        })
        .await?;

    info!(
        match_id,
        theme = %challenge.theme,
        challenge_id = %challenge.id,
        "challenge skipped"
    );
    Ok(challenge)
}

/// Score both sides of a round.
pub async fn submit_round(
    state: &SharedState,
    request: SubmitRoundRequest,
) -> Result<RoundResponse, ServiceError> {
    let response = state
        .run_announced_command("submit_round", |engine| {
            let outcome =
                engine.submit_round(&request.match_id, request.team_a, request.team_b)?;
            Ok(scored_round(engine, outcome))
        })
        .await?;

    info!(
        match_id = %request.match_id,
        team_a = ?request.team_a,
        team_b = ?request.team_b,
        resolved = response.resolved,
        "round scored"
    );
    Ok(response)
}

/// Score one side of a round.
pub async fn submit_challenge(
    state: &SharedState,
    request: SubmitChallengeRequest,
) -> Result<RoundResponse, ServiceError> {
    let response = state
        .run_announced_command("submit_challenge", |engine| {
            let outcome =
                engine.submit_challenge(&request.match_id, request.team, request.result)?;
            Ok(scored_round(engine, outcome))
        })
        .await?;

    info!(
        match_id = %request.match_id,
        side = ?request.team,
        result = ?request.result,
        resolved = response.resolved,
        "single-side round scored"
    );
    Ok(response)
}

/// Response for a scored round plus its `score:update`, then either `match:advance` or
/// the next `challenge:new`.
fn scored_round(
    engine: &BracketEngine,
    outcome: RoundOutcome,
) -> (RoundResponse, Vec<ServerMessage>) {
    let RoundOutcome { game, resolved } = outcome;
    let mut messages = vec![broadcast::score_message(&game.id, game.score, resolved)];
    if resolved {
        messages.push(broadcast::match_advance_message(&game));
    } else if let Some(challenge) = &game.current_challenge {
        messages.push(broadcast::challenge_message(&game.id, challenge));
    }
    let response = RoundResponse {
        game: project(engine, &game),
        resolved,
    };
    (response, messages)
}

/// Declare a winner by hand.
pub async fn advance(
    state: &SharedState,
    match_id: &str,
    winner_id: &str,
) -> Result<MatchSnapshot, ServiceError> {
    let snapshot = state
        .run_announced_command("advance", |engine| {
            let game = engine.advance(match_id, winner_id)?;
            let messages = vec![broadcast::match_advance_message(&game)];
            Ok((project(engine, &game), messages))
        })
        .await?;

    info!(match_id, winner_id, "match advanced manually");
    Ok(snapshot)
}

/// Correct a match tally or leaderboard scores.
pub async fn override_score(
    state: &SharedState,
    request: OverrideScoreRequest,
) -> Result<MatchSnapshot, ServiceError> {
    let OverrideScoreRequest {
        match_id,
        team_a_score,
        team_b_score,
        leaderboard_delta,
    } = request;
    let snapshot = state
        .run_announced_command("override_score", |engine| {
            let game = engine.override_score(
                &match_id,
                team_a_score,
                team_b_score,
                leaderboard_delta,
            )?;
            let messages = vec![broadcast::score_message(&game.id, game.score, false)];
            Ok((project(engine, &game), messages))
        })
        .await?;

    info!(match_id = %match_id, ?team_a_score, ?team_b_score, "score overridden");
    Ok(snapshot)
}

/// Roll a match back to pending.
pub async fn reset_match(
    state: &SharedState,
    match_id: &str,
) -> Result<MatchSnapshot, ServiceError> {
    let snapshot = state
        .run_command("reset_match", |engine| {
            let game = engine.reset_match(match_id)?;
            Ok(project(engine, &game))
        })
        .await?;

    info!(match_id, "match reset");
    Ok(snapshot)
}

/// Drop the challenge on screen.
pub async fn reset_round(
    state: &SharedState,
    match_id: &str,
) -> Result<MatchSnapshot, ServiceError> {
    let snapshot = state
        .run_command("reset_round", |engine| {
            let game = engine.reset_round(match_id)?;
            Ok(project(engine, &game))
        })
        .await?;

    info!(match_id, "round reset");
    Ok(snapshot)
}

/// Wipe every result and rebuild the bracket.
pub async fn reset_tournament(
    state: &SharedState,
    request: ResetTournamentRequest,
) -> Result<TournamentSnapshot, ServiceError> {
    if !request.confirm {
        return Err(ServiceError::InvalidInput(
            "tournament reset must be confirmed".into(),
        ));
    }

    let teams = request
        .teams
        .map(|teams| teams.into_iter().map(Team::from).collect::<Vec<_>>());
    let settings = request.settings;
    let snapshot = state
        .run_command("reset_tournament", |engine| {
            engine.reset_tournament(teams, settings)?;
            Ok(TournamentSnapshot::from(engine.state()))
        })
        .await?;

    warn!(teams = snapshot.leaderboard.len(), "tournament reset");
    Ok(snapshot)
}

/// Replace the roster.
pub async fn set_teams(
    state: &SharedState,
    request: SetTeamsRequest,
) -> Result<Vec<Team>, ServiceError> {
    let teams: Vec<Team> = request.0.into_iter().map(Team::from).collect();
    let leaderboard = state
        .run_command("set_teams", |engine| {
            engine.set_teams(teams)?;
            Ok(engine.state().leaderboard.clone())
        })
        .await?;

    info!(teams = leaderboard.len(), "roster replaced");
    Ok(leaderboard)
}

/// Fan a sound cue out to every screen. Nothing is persisted.
pub fn play_sfx(state: &SharedState, event: &str) {
    info!(event, "sound cue");
    broadcast::broadcast_sfx(state, event);
}
