use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

use crate::{
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

/// Admin secret passed as a query parameter, since `EventSource` cannot set headers.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/sse/{code}/public",
    tag = "sse",
    params(("code" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Player room stream", content_type = "text/event-stream", body = String),
        (status = 400, description = "Malformed session id"),
        (status = 404, description = "Unknown session")
    )
)]
/// Stream the events sent to players and displays of a session.
pub async fn public_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let code = state.resolve_session_id(Some(&code))?;
    let receiver = sse_service::subscribe_public(&state, &code)?;
    info!(session = %code, "New public SSE connection");
    Ok(sse_service::to_sse_stream(receiver, code, StreamKind::Public))
}

#[utoipa::path(
    get,
    path = "/sse/{code}/admin",
    tag = "sse",
    params(("code" = String, Path, description = "Session identifier"), TokenQuery),
    responses(
        (status = 200, description = "Admin room stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Unknown session")
    )
)]
/// Stream admin-only events of a session.
pub async fn admin_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let code = state.resolve_session_id(Some(&code))?;
    let receiver = sse_service::subscribe_admin(&state, &code, query.token.as_deref())?;
    info!(session = %code, "New admin SSE connection");
    Ok(sse_service::to_sse_stream(receiver, code, StreamKind::Admin))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/{code}/public", get(public_stream))
        .route("/sse/{code}/admin", get(admin_stream))
}
