use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::engine::BracketError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<BracketError> for ServiceError {
    fn from(err: BracketError) -> Self {
        let message = err.to_string();
        match err {
            BracketError::MatchNotFound(_) | BracketError::TeamNotFound(_) => {
                ServiceError::NotFound(message)
            }
            BracketError::UnresolvedSlots(_)
            | BracketError::MatchInProgress(_)
            | BracketError::NotInProgress(_)
            | BracketError::InvalidTransition(_)
            | BracketError::EmptyPool(_)
            | BracketError::TeamInUse(_) => ServiceError::InvalidState(message),
            BracketError::InvalidWinner { .. }
            | BracketError::NotEnoughTeams { .. }
            | BracketError::DuplicateTeam(_)
            | BracketError::Topology(_) => ServiceError::InvalidInput(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        state_machine::{InvalidTransition, MatchEvent},
        tournament::MatchStatus,
    };

    fn status_of(err: BracketError) -> StatusCode {
        AppError::from(ServiceError::from(err))
            .into_response()
            .status()
    }

    #[test]
    fn bracket_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(BracketError::MatchNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BracketError::MatchInProgress("g1".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(BracketError::InvalidTransition(InvalidTransition {
                from: MatchStatus::Completed,
                event: MatchEvent::Start,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(BracketError::InvalidWinner {
                match_id: "g1".into(),
                team_id: "t9".into(),
            }),
            StatusCode::BAD_REQUEST
        );
    }
}
