use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        events::StatusEvent,
        public::{
            PublicLeaderboardEntry, RegisterRequest, RegisterResponse, SessionQuery,
            ValidateResponse,
        },
    },
    error::AppError,
    routes::SessionCode,
    services::{leaderboard_service, quiz_service},
    state::SharedState,
};

/// Public endpoints used by player and display screens. Every route also accepts the
/// session in the path under `/api/quiz/{code}`.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/quiz/register", post(register))
        .route("/api/quiz/{code}/register", post(register))
        .route("/api/quiz/leaderboard", get(leaderboard))
        .route("/api/quiz/{code}/leaderboard", get(leaderboard))
        .route("/api/quiz/status", get(status))
        .route("/api/quiz/{code}/status", get(status))
        .route("/api/quiz/validate", get(validate))
        .route("/api/quiz/{code}/validate", get(validate))
}

/// Register a player, or return the identity already bound to the email.
#[utoipa::path(
    post,
    path = "/api/quiz/register",
    tag = "public",
    params(SessionQuery),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Player identity", body = RegisterResponse),
        (status = 400, description = "Malformed email"),
        (status = 403, description = "Email not on the allow-list"),
        (status = 404, description = "Unknown session"),
        (status = 422, description = "Missing name or email")
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    Valid(Json(payload)): Valid<Json<RegisterRequest>>,
) -> Result<Json<RegisterResponse>, AppError> {
    Ok(Json(quiz_service::register(&state, &code, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/quiz/leaderboard",
    tag = "public",
    params(SessionQuery),
    responses((status = 200, description = "Names and scores, best first", body = [PublicLeaderboardEntry]))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<Vec<PublicLeaderboardEntry>>, AppError> {
    Ok(Json(leaderboard_service::public_leaderboard(&state, &code).await?))
}

/// Same payload as the `status` event.
#[utoipa::path(
    get,
    path = "/api/quiz/status",
    tag = "public",
    params(SessionQuery),
    responses((status = 200, description = "Current status", body = StatusEvent))
)]
pub async fn status(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<StatusEvent>, AppError> {
    Ok(Json(quiz_service::status(&state, &code).await?))
}

#[utoipa::path(
    get,
    path = "/api/quiz/validate",
    tag = "public",
    params(SessionQuery),
    responses((status = 200, description = "Whether the session exists", body = ValidateResponse))
)]
pub async fn validate(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Json<ValidateResponse> {
    Json(ValidateResponse {
        valid: state.registry().get(&code).is_some(),
    })
}
