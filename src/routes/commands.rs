use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::{
        commands::{
            ActionResponse, AdvanceRequest, MatchCommand, OverrideScoreRequest,
            ResetTournamentRequest, RoundResponse, SetTeamsRequest, SfxRequest,
            SubmitChallengeRequest, SubmitRoundRequest, ThemeRequest,
        },
        snapshot::{MatchSnapshot, TournamentSnapshot},
    },
    error::AppError,
    services::tournament_service,
    state::{
        SharedState,
        tournament::{Challenge, Team},
    },
};

/// Host console commands. Responses describe the affected entity; screens should rely
/// on the `state:update` broadcast that follows every command.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/start-match", post(start_match))
        .route("/theme", post(set_theme))
        .route("/submit-challenge", post(submit_challenge))
        .route("/submit-round", post(submit_round))
        .route("/next-challenge", post(next_challenge))
        .route("/advance", post(advance))
        .route("/override-score", post(override_score))
        .route("/reset-match", post(reset_match))
        .route("/reset-round", post(reset_round))
        .route("/reset", post(reset_tournament))
        .route("/teams", post(set_teams))
        .route("/sfx", post(play_sfx))
}

/// Put a match on screen.
#[utoipa::path(
    post,
    path = "/start-match",
    tag = "commands",
    request_body = MatchCommand,
    responses(
        (status = 200, description = "Match in progress", body = MatchSnapshot),
        (status = 404, description = "Unknown match"),
        (status = 409, description = "Slots unresolved, match completed or another match in progress")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MatchCommand>>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(
        tournament_service::start_match(&state, &payload.match_id).await?,
    ))
}

/// Choose the theme of the next challenge and draw it.
#[utoipa::path(
    post,
    path = "/theme",
    tag = "commands",
    request_body = ThemeRequest,
    responses(
        (status = 200, description = "Challenge drawn", body = Challenge),
        (status = 409, description = "Match not in progress or challenge pool empty")
    )
)]
pub async fn set_theme(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ThemeRequest>>,
) -> Result<Json<Challenge>, AppError> {
    Ok(Json(tournament_service::set_theme(&state, payload).await?))
}

/// Score a single side of the current round.
#[utoipa::path(
    post,
    path = "/submit-challenge",
    tag = "commands",
    request_body = SubmitChallengeRequest,
    responses(
        (status = 200, description = "Round scored", body = RoundResponse),
        (status = 409, description = "Match not in progress")
    )
)]
pub async fn submit_challenge(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubmitChallengeRequest>>,
) -> Result<Json<RoundResponse>, AppError> {
    Ok(Json(
        tournament_service::submit_challenge(&state, payload).await?,
    ))
}

/// Score both sides of the current round and advance the bracket when decided.
#[utoipa::path(
    post,
    path = "/submit-round",
    tag = "commands",
    request_body = SubmitRoundRequest,
    responses(
        (status = 200, description = "Round scored", body = RoundResponse),
        (status = 409, description = "Match not in progress")
    )
)]
pub async fn submit_round(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubmitRoundRequest>>,
) -> Result<Json<RoundResponse>, AppError> {
    Ok(Json(tournament_service::submit_round(&state, payload).await?))
}

/// Replace the challenge on screen without scoring.
#[utoipa::path(
    post,
    path = "/next-challenge",
    tag = "commands",
    request_body = MatchCommand,
    responses(
        (status = 200, description = "Challenge drawn", body = Challenge),
        (status = 409, description = "Match not in progress or challenge pool empty")
    )
)]
pub async fn next_challenge(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MatchCommand>>,
) -> Result<Json<Challenge>, AppError> {
    Ok(Json(
        tournament_service::next_challenge(&state, &payload.match_id).await?,
    ))
}

/// Declare the winner of a match by hand.
#[utoipa::path(
    post,
    path = "/advance",
    tag = "commands",
    request_body = AdvanceRequest,
    responses(
        (status = 200, description = "Match completed", body = MatchSnapshot),
        (status = 400, description = "Winner is not in the match"),
        (status = 409, description = "Slots unresolved or match already completed")
    )
)]
pub async fn advance(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AdvanceRequest>>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(
        tournament_service::advance(&state, &payload.match_id, &payload.winner_id).await?,
    ))
}

/// Correct a match tally or adjust leaderboard scores.
#[utoipa::path(
    post,
    path = "/override-score",
    tag = "commands",
    request_body = OverrideScoreRequest,
    responses(
        (status = 200, description = "Scores updated", body = MatchSnapshot),
        (status = 404, description = "Unknown match or team")
    )
)]
pub async fn override_score(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<OverrideScoreRequest>>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(
        tournament_service::override_score(&state, payload).await?,
    ))
}

/// Roll a match back to pending, vacating anything it fed.
#[utoipa::path(
    post,
    path = "/reset-match",
    tag = "commands",
    request_body = MatchCommand,
    responses(
        (status = 200, description = "Match reset", body = MatchSnapshot),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn reset_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MatchCommand>>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(
        tournament_service::reset_match(&state, &payload.match_id).await?,
    ))
}

/// Drop the challenge on screen and release it back to the pool.
#[utoipa::path(
    post,
    path = "/reset-round",
    tag = "commands",
    request_body = MatchCommand,
    responses(
        (status = 200, description = "Round reset", body = MatchSnapshot),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn reset_round(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MatchCommand>>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(
        tournament_service::reset_round(&state, &payload.match_id).await?,
    ))
}

/// Wipe every result and rebuild the bracket.
#[utoipa::path(
    post,
    path = "/reset",
    tag = "commands",
    request_body = ResetTournamentRequest,
    responses(
        (status = 200, description = "Tournament reset", body = TournamentSnapshot),
        (status = 400, description = "Reset not confirmed or roster invalid")
    )
)]
pub async fn reset_tournament(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ResetTournamentRequest>>,
) -> Result<Json<TournamentSnapshot>, AppError> {
    Ok(Json(
        tournament_service::reset_tournament(&state, payload).await?,
    ))
}

/// Replace the roster.
#[utoipa::path(
    post,
    path = "/teams",
    tag = "commands",
    request_body = SetTeamsRequest,
    responses(
        (status = 200, description = "Roster replaced", body = [Team]),
        (status = 400, description = "Too few teams or duplicate ids"),
        (status = 409, description = "A removed team still plays in a started match")
    )
)]
pub async fn set_teams(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SetTeamsRequest>>,
) -> Result<Json<Vec<Team>>, AppError> {
    Ok(Json(tournament_service::set_teams(&state, payload).await?))
}

/// Broadcast a sound cue to every screen.
#[utoipa::path(
    post,
    path = "/sfx",
    tag = "commands",
    request_body = SfxRequest,
    responses((status = 200, description = "Cue broadcast", body = ActionResponse))
)]
pub async fn play_sfx(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SfxRequest>>,
) -> Json<ActionResponse> {
    tournament_service::play_sfx(&state, &payload.event);
    Json(ActionResponse {
        message: format!("sound cue `{}` broadcast", payload.event),
    })
}
