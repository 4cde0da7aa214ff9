use std::collections::HashMap;

use axum::{
    Router,
    extract::{FromRequestParts, Path, Query},
    http::request::Parts,
};

use crate::{dto::public::SessionQuery, error::AppError, state::SharedState};

pub mod admin;
pub mod docs;
pub mod health;
pub mod public;
pub mod sse;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(admin::router(state.clone()))
        .merge(public::router())
        .merge(sse::router())
        .merge(websocket::router())
        .merge(docs::router());

    api_router.with_state(state)
}

/// Session targeted by a request: the `{code}` path segment, else the `session` query
/// parameter, else the configured default session. Always normalized; malformed ids are
/// rejected with 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCode(pub String);

impl FromRequestParts<SharedState> for SessionCode {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let from_path = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|Path(mut params)| params.remove("code"));
        let requested = match from_path {
            Some(code) => Some(code),
            None => Query::<SessionQuery>::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|Query(query)| query.session),
        };
        Ok(Self(state.resolve_session_id(requested.as_deref())?))
    }
}
