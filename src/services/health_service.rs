use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the last save succeeded, logging storage connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Err(err) = state.store().health_check().await {
        warn!(error = %err, "storage health check failed");
    }

    let viewers = state.viewers().len();
    if state.is_degraded() {
        HealthResponse::degraded(viewers)
    } else {
        HealthResponse::ok(viewers)
    }
}
