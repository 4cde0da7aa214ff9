/// Lifecycle commands issued by the quiz host.
pub mod admin_service;
/// Fan-out of events to rooms and individual connections.
pub mod dispatch;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Leaderboard projections, overlay and archives.
pub mod leaderboard_service;
/// Write-behind persistence of sessions.
pub mod persistence;
/// Session setup, questions, registration and roster administration.
pub mod quiz_service;
/// Realtime protocol: identification and per-connection message handling.
pub mod socket_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// WebSocket connection lifecycle.
pub mod websocket_service;

#[cfg(test)]
pub mod test_support;
