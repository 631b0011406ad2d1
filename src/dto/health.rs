use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health response returned by the `/health` route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of connected viewers.
    pub viewers: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(viewers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            viewers,
        }
    }

    /// Create a health response indicating the last save failed.
    pub fn degraded(viewers: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            viewers,
        }
    }
}
