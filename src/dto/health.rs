use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by `/healthcheck`.
///
/// `degraded` covers both a missing store and a down live link; the board
/// keeps serving its last snapshot either way.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, `ok` or `degraded`.
    pub status: &'static str,
}

impl HealthResponse {
    /// Store installed and live link up.
    pub fn ok() -> Self {
        Self { status: "ok" }
    }

    /// Running on stale data: no store, or the live link is down.
    pub fn degraded() -> Self {
        Self { status: "degraded" }
    }
}
