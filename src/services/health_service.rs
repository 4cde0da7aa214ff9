use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of sessions held in memory.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let sessions = state.registry().len();
    debug!(sessions, "health check");
    HealthResponse::ok(sessions)
}
