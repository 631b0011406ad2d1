//! Read-only projections of the tournament.

use std::time::SystemTime;

use crate::{
    dto::{commands::ExportResponse, format_system_time, snapshot::TournamentSnapshot},
    error::ServiceError,
    state::SharedState,
};

/// Full snapshot of the committed tournament.
pub async fn get_state(state: &SharedState) -> TournamentSnapshot {
    TournamentSnapshot::from(state.engine().await.state())
}

/// Pretty-printed JSON dump of the snapshot, for backups taken by the host.
pub async fn export_state(state: &SharedState) -> Result<ExportResponse, ServiceError> {
    let snapshot = get_state(state).await;
    let text = serde_json::to_string_pretty(&snapshot)
        .map_err(|err| ServiceError::Internal(format!("failed to serialise snapshot: {err}")))?;

    Ok(ExportResponse {
        state: text,
        exported_at: format_system_time(SystemTime::now()),
    })
}
