use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Clash Back.
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::websocket::ws_handler,
        crate::routes::public::get_state,
        crate::routes::public::export_state,
        crate::routes::commands::start_match,
        crate::routes::commands::set_theme,
        crate::routes::commands::submit_challenge,
        crate::routes::commands::submit_round,
        crate::routes::commands::next_challenge,
        crate::routes::commands::advance,
        crate::routes::commands::override_score,
        crate::routes::commands::reset_match,
        crate::routes::commands::reset_round,
        crate::routes::commands::reset_tournament,
        crate::routes::commands::set_teams,
        crate::routes::commands::play_sfx,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::snapshot::TournamentSnapshot,
            crate::dto::snapshot::MatchSnapshot,
            crate::dto::commands::MatchCommand,
            crate::dto::commands::ThemeRequest,
            crate::dto::commands::SubmitChallengeRequest,
            crate::dto::commands::SubmitRoundRequest,
            crate::dto::commands::AdvanceRequest,
            crate::dto::commands::OverrideScoreRequest,
            crate::dto::commands::TeamInput,
            crate::dto::commands::SetTeamsRequest,
            crate::dto::commands::ResetTournamentRequest,
            crate::dto::commands::SfxRequest,
            crate::dto::commands::RoundResponse,
            crate::dto::commands::ExportResponse,
            crate::dto::commands::ActionResponse,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::ViewerMessage,
            crate::state::tournament::Team,
            crate::state::tournament::Challenge,
            crate::state::tournament::Theme,
            crate::state::tournament::Settings,
            crate::state::tournament::MatchScore,
            crate::state::tournament::MatchStatus,
            crate::state::tournament::RoundResult,
            crate::state::tournament::Side,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only tournament views"),
        (name = "commands", description = "Host console commands"),
        (name = "realtime", description = "WebSocket channel for screens"),
    )
)]
pub struct ApiDoc;
