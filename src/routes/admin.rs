use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use axum_valid::Valid;
use validator::Validate;

use crate::{
    dto::{
        admin::{
            ActionResponse, AdminLeaderboardEntry, AllowedEmailsRequest, AllowedEmailsResponse,
            CommandResponse, CreateQuizResponse, DeleteQuizResponse, DisconnectResponse, GotoRequest,
            LeaderboardSnapshot, LifelinesRequest, LifelinesResponse, PauseResponse,
            QuestionSetList, QuestionSetNameRequest, QuestionSetSaveRequest, QuestionSetSaved,
            QuestionsPayload, SnapshotApplied, SnapshotFileRequest, SnapshotList,
            SnapshotsCleared, StartRequest, SuddenDeathStartRequest,
        },
        events::{FinalResultsEvent, StatusEvent},
    },
    error::AppError,
    routes::SessionCode,
    services::{admin_service, leaderboard_service, quiz_service},
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints. Session-scoped routes exist both for the default session under
/// `/api/admin` and for any session under `/api/admin/quiz/{code}`.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/api/admin/quiz", post(create_quiz))
        .route("/api/admin/quiz/{code}", post(create_quiz).delete(delete_quiz))
        .route("/api/admin/question_sets", get(list_question_sets))
        .route("/api/admin/question_sets/save", post(save_question_set))
        .route("/api/admin/question_sets/load", post(load_question_set))
        .route("/api/admin/question_sets/{name}", delete(delete_question_set))
        .route("/api/admin/full_reset", post(full_reset))
        .nest("/api/admin", session_router())
        .nest("/api/admin/quiz/{code}", session_router())
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

fn session_router() -> Router<SharedState> {
    Router::new()
        .route("/questions", post(upload_questions))
        .route("/questions/export", get(export_questions).post(export_questions))
        .route("/question_sets/apply", post(apply_question_set))
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/goto", post(goto))
        .route("/next", post(next))
        .route("/reveal", post(reveal))
        .route("/pause", post(pause))
        .route("/reset", post(reset))
        .route("/lifelines", post(set_lifelines))
        .route("/allowed_emails", get(get_allowed_emails).post(set_allowed_emails))
        .route("/sudden_death/start", post(start_sudden_death))
        .route("/sudden_death/stop", post(stop_sudden_death))
        .route("/final_results", get(final_results))
        .route("/leaderboard", get(leaderboard))
        .route("/leaderboard/show", post(show_leaderboard))
        .route("/leaderboard/hide", post(hide_leaderboard))
        .route("/leaderboard/reset", post(reset_leaderboard))
        .route("/leaderboard/snapshots", get(list_snapshots))
        .route("/leaderboard/snapshots/load", post(load_snapshot))
        .route("/leaderboard/snapshots/apply", post(apply_snapshot))
        .route("/leaderboard/snapshots/clear", post(clear_snapshots))
        .route("/disconnect_all", post(disconnect_all))
}

/// Create the default session, or return it when it already exists.
#[utoipa::path(
    post,
    path = "/api/admin/quiz",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Session identifier", body = CreateQuizResponse))
)]
pub async fn create_quiz(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<CreateQuizResponse>, AppError> {
    Ok(Json(quiz_service::create_session(&state, Some(&code)).await?))
}

/// Delete a session, closing every connection attached to it.
#[utoipa::path(
    delete,
    path = "/api/admin/quiz/{code}",
    tag = "admin",
    params(
        ("X-Admin-Token" = String, Header, description = "Shared admin secret"),
        ("code" = String, Path, description = "Session identifier")
    ),
    responses(
        (status = 200, description = "Session deleted", body = DeleteQuizResponse),
        (status = 400, description = "Malformed session id"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn delete_quiz(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<DeleteQuizResponse>, AppError> {
    Ok(Json(quiz_service::delete_session(&state, &code).await?))
}

/// Replace every question of the session.
#[utoipa::path(
    post,
    path = "/api/admin/questions",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = QuestionsPayload,
    responses(
        (status = 200, description = "Questions stored", body = ActionResponse),
        (status = 400, description = "Invalid question list"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn upload_questions(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    Valid(Json(payload)): Valid<Json<QuestionsPayload>>,
) -> Result<Json<ActionResponse>, AppError> {
    let count = quiz_service::upload_questions(&state, &code, payload).await?;
    Ok(Json(ActionResponse::with_count(count)))
}

#[utoipa::path(
    post,
    path = "/api/admin/questions/export",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Current questions with answers", body = QuestionsPayload))
)]
pub async fn export_questions(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<QuestionsPayload>, AppError> {
    Ok(Json(quiz_service::export_questions(&state, &code).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/question_sets",
    tag = "question_sets",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Stored question sets", body = QuestionSetList))
)]
pub async fn list_question_sets(
    State(state): State<SharedState>,
) -> Result<Json<QuestionSetList>, AppError> {
    Ok(Json(quiz_service::list_question_sets(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/question_sets/save",
    tag = "question_sets",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = QuestionSetSaveRequest,
    responses((status = 200, description = "Question set stored", body = QuestionSetSaved))
)]
pub async fn save_question_set(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<QuestionSetSaveRequest>>,
) -> Result<Json<QuestionSetSaved>, AppError> {
    Ok(Json(quiz_service::save_question_set(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/question_sets/load",
    tag = "question_sets",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = QuestionSetNameRequest,
    responses(
        (status = 200, description = "Stored questions", body = QuestionsPayload),
        (status = 404, description = "Unknown question set"),
        (status = 422, description = "Stored set is malformed")
    )
)]
pub async fn load_question_set(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<QuestionSetNameRequest>>,
) -> Result<Json<QuestionsPayload>, AppError> {
    Ok(Json(quiz_service::load_question_set(&state, &payload.name).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/question_sets/{name}",
    tag = "question_sets",
    params(
        ("X-Admin-Token" = String, Header, description = "Shared admin secret"),
        ("name" = String, Path, description = "Question set name")
    ),
    responses(
        (status = 200, description = "Question set deleted", body = ActionResponse),
        (status = 404, description = "Unknown question set")
    )
)]
pub async fn delete_question_set(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    quiz_service::delete_question_set(&state, &name).await?;
    Ok(Json(ActionResponse::ok()))
}

/// Replace the session questions with a stored set.
#[utoipa::path(
    post,
    path = "/api/admin/question_sets/apply",
    tag = "question_sets",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = QuestionSetNameRequest,
    responses(
        (status = 200, description = "Questions replaced", body = ActionResponse),
        (status = 404, description = "Unknown session or question set"),
        (status = 422, description = "Stored set is malformed")
    )
)]
pub async fn apply_question_set(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    Valid(Json(payload)): Valid<Json<QuestionSetNameRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let count = quiz_service::apply_question_set(&state, &code, &payload.name).await?;
    Ok(Json(ActionResponse::with_count(count)))
}

#[utoipa::path(
    get,
    path = "/api/admin/status",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Current status", body = StatusEvent))
)]
pub async fn status(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<StatusEvent>, AppError> {
    Ok(Json(quiz_service::status(&state, &code).await?))
}

/// Start a round, restoring every player's lifelines.
#[utoipa::path(
    post,
    path = "/api/admin/start",
    tag = "lifecycle",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = StartRequest,
    responses(
        (status = 200, description = "Round started", body = CommandResponse),
        (status = 409, description = "No questions loaded"),
        (status = 422, description = "Index out of range")
    )
)]
pub async fn start(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    payload: Option<Json<StartRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    Ok(Json(admin_service::start(&state, &code, request).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/goto",
    tag = "lifecycle",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = GotoRequest,
    responses(
        (status = 200, description = "Question on screen", body = CommandResponse),
        (status = 422, description = "Index out of range")
    )
)]
pub async fn goto(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    Valid(Json(payload)): Valid<Json<GotoRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(admin_service::goto(&state, &code, payload.index).await?))
}

/// Reveal the open question, or advance when already revealed.
#[utoipa::path(
    post,
    path = "/api/admin/next",
    tag = "lifecycle",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses(
        (status = 200, description = "Session advanced", body = CommandResponse),
        (status = 409, description = "No questions loaded")
    )
)]
pub async fn next(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(admin_service::next(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/reveal",
    tag = "lifecycle",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Question settled", body = CommandResponse))
)]
pub async fn reveal(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(admin_service::reveal(&state, &code).await?))
}

/// Toggle the pause state of the question on screen.
#[utoipa::path(
    post,
    path = "/api/admin/pause",
    tag = "lifecycle",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Pause toggled", body = PauseResponse))
)]
pub async fn pause(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<PauseResponse>, AppError> {
    Ok(Json(admin_service::toggle_pause(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/reset",
    tag = "lifecycle",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Questions cleared", body = ActionResponse))
)]
pub async fn reset(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::reset(&state, &code).await?))
}

/// Drop every session and recreate an empty default one.
#[utoipa::path(
    post,
    path = "/api/admin/full_reset",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Fresh default session", body = CreateQuizResponse))
)]
pub async fn full_reset(State(state): State<SharedState>) -> Result<Json<CreateQuizResponse>, AppError> {
    Ok(Json(quiz_service::full_reset(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/lifelines",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = LifelinesRequest,
    responses((status = 200, description = "Lifeline switches", body = LifelinesResponse))
)]
pub async fn set_lifelines(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    Valid(Json(payload)): Valid<Json<LifelinesRequest>>,
) -> Result<Json<LifelinesResponse>, AppError> {
    Ok(Json(quiz_service::set_lifelines(&state, &code, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/allowed_emails",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Registration allow-list", body = AllowedEmailsResponse))
)]
pub async fn get_allowed_emails(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<AllowedEmailsResponse>, AppError> {
    Ok(Json(quiz_service::allowed_emails(&state, &code).await?))
}

/// Replace, extend or shrink the registration allow-list.
#[utoipa::path(
    post,
    path = "/api/admin/allowed_emails",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = AllowedEmailsRequest,
    responses((status = 200, description = "Updated allow-list", body = AllowedEmailsResponse))
)]
pub async fn set_allowed_emails(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    Valid(Json(payload)): Valid<Json<AllowedEmailsRequest>>,
) -> Result<Json<AllowedEmailsResponse>, AppError> {
    Ok(Json(quiz_service::set_allowed_emails(&state, &code, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/sudden_death/start",
    tag = "lifecycle",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = SuddenDeathStartRequest,
    responses((status = 200, description = "Sudden death active", body = ActionResponse))
)]
pub async fn start_sudden_death(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    payload: Option<Json<SuddenDeathStartRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    request.validate()?;
    Ok(Json(admin_service::start_sudden_death(&state, &code, request).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/sudden_death/stop",
    tag = "lifecycle",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Sudden death lifted", body = ActionResponse))
)]
pub async fn stop_sudden_death(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::stop_sudden_death(&state, &code).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/final_results",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Ranked results with tie-break statistics", body = FinalResultsEvent))
)]
pub async fn final_results(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<FinalResultsEvent>, AppError> {
    Ok(Json(admin_service::final_results(&state, &code).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/leaderboard",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Ranked roster", body = [AdminLeaderboardEntry]))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<Vec<AdminLeaderboardEntry>>, AppError> {
    Ok(Json(leaderboard_service::admin_leaderboard(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/leaderboard/show",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Overlay shown", body = ActionResponse))
)]
pub async fn show_leaderboard(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(leaderboard_service::show(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/leaderboard/hide",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Overlay hidden", body = ActionResponse))
)]
pub async fn hide_leaderboard(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(leaderboard_service::hide(&state, &code).await?))
}

/// Zero every player's score and tie-break statistics.
#[utoipa::path(
    post,
    path = "/api/admin/leaderboard/reset",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Scores cleared", body = ActionResponse))
)]
pub async fn reset_leaderboard(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(leaderboard_service::reset_scores(&state, &code).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/leaderboard/snapshots",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Archived leaderboards, newest first", body = SnapshotList))
)]
pub async fn list_snapshots(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<SnapshotList>, AppError> {
    Ok(Json(leaderboard_service::list_snapshots(&state, &code).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/leaderboard/snapshots/load",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = SnapshotFileRequest,
    responses(
        (status = 200, description = "Archived leaderboard", body = LeaderboardSnapshot),
        (status = 404, description = "Unknown snapshot")
    )
)]
pub async fn load_snapshot(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SnapshotFileRequest>>,
) -> Result<Json<LeaderboardSnapshot>, AppError> {
    Ok(Json(leaderboard_service::load_snapshot(&state, &payload.file).await?))
}

/// Restore scores from an archived leaderboard.
#[utoipa::path(
    post,
    path = "/api/admin/leaderboard/snapshots/apply",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    request_body = SnapshotFileRequest,
    responses(
        (status = 200, description = "Scores restored", body = SnapshotApplied),
        (status = 404, description = "Unknown session or snapshot")
    )
)]
pub async fn apply_snapshot(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    Valid(Json(payload)): Valid<Json<SnapshotFileRequest>>,
) -> Result<Json<SnapshotApplied>, AppError> {
    Ok(Json(
        leaderboard_service::apply_snapshot(&state, &code, &payload.file).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/leaderboard/snapshots/clear",
    tag = "leaderboard",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Archive purged", body = SnapshotsCleared))
)]
pub async fn clear_snapshots(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<SnapshotsCleared>, AppError> {
    Ok(Json(leaderboard_service::clear_snapshots(&state, &code).await?))
}

/// Close every player connection of the session.
#[utoipa::path(
    post,
    path = "/api/admin/disconnect_all",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Shared admin secret")),
    responses((status = 200, description = "Connections closed", body = DisconnectResponse))
)]
pub async fn disconnect_all(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<DisconnectResponse>, AppError> {
    Ok(Json(quiz_service::disconnect_all(&state, &code).await?))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    if state.is_admin_token(provided) {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid admin token".into()))
    }
}
