use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::admin::create_quiz,
        crate::routes::admin::delete_quiz,
        crate::routes::admin::upload_questions,
        crate::routes::admin::export_questions,
        crate::routes::admin::list_question_sets,
        crate::routes::admin::save_question_set,
        crate::routes::admin::load_question_set,
        crate::routes::admin::delete_question_set,
        crate::routes::admin::apply_question_set,
        crate::routes::admin::status,
        crate::routes::admin::start,
        crate::routes::admin::goto,
        crate::routes::admin::next,
        crate::routes::admin::reveal,
        crate::routes::admin::pause,
        crate::routes::admin::reset,
        crate::routes::admin::full_reset,
        crate::routes::admin::set_lifelines,
        crate::routes::admin::get_allowed_emails,
        crate::routes::admin::set_allowed_emails,
        crate::routes::admin::start_sudden_death,
        crate::routes::admin::stop_sudden_death,
        crate::routes::admin::final_results,
        crate::routes::admin::leaderboard,
        crate::routes::admin::show_leaderboard,
        crate::routes::admin::hide_leaderboard,
        crate::routes::admin::reset_leaderboard,
        crate::routes::admin::list_snapshots,
        crate::routes::admin::load_snapshot,
        crate::routes::admin::apply_snapshot,
        crate::routes::admin::clear_snapshots,
        crate::routes::admin::disconnect_all,
        crate::routes::public::register,
        crate::routes::public::leaderboard,
        crate::routes::public::status,
        crate::routes::public::validate,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::admin::ChoiceInput,
            crate::dto::admin::QuestionInput,
            crate::dto::admin::QuestionsPayload,
            crate::dto::admin::QuestionSetSaveRequest,
            crate::dto::admin::QuestionSetNameRequest,
            crate::dto::admin::QuestionSetItem,
            crate::dto::admin::QuestionSetList,
            crate::dto::admin::QuestionSetSaved,
            crate::dto::admin::CreateQuizResponse,
            crate::dto::admin::DeleteQuizResponse,
            crate::dto::admin::StartRequest,
            crate::dto::admin::GotoRequest,
            crate::dto::admin::CommandResponse,
            crate::dto::admin::PauseResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::LifelinesRequest,
            crate::dto::admin::LifelinesResponse,
            crate::dto::admin::AllowedEmailsRequest,
            crate::dto::admin::AllowedEmailsResponse,
            crate::dto::admin::SuddenDeathStartRequest,
            crate::dto::admin::AdminLeaderboardEntry,
            crate::dto::admin::SnapshotFileRequest,
            crate::dto::admin::SnapshotListItem,
            crate::dto::admin::SnapshotList,
            crate::dto::admin::LeaderboardSnapshot,
            crate::dto::admin::SnapshotApplied,
            crate::dto::admin::SnapshotsCleared,
            crate::dto::admin::DisconnectResponse,
            crate::dto::public::RegisterRequest,
            crate::dto::public::RegisterResponse,
            crate::dto::public::PublicLeaderboardEntry,
            crate::dto::public::ValidateResponse,
            crate::dto::events::ChoiceView,
            crate::dto::events::QuestionView,
            crate::dto::events::QuestionEvent,
            crate::dto::events::StatusEvent,
            crate::dto::events::RevealEvent,
            crate::dto::events::AnswerResultEvent,
            crate::dto::events::AnswerLockedEvent,
            crate::dto::events::AnswerRejectedEvent,
            crate::dto::events::AnswerSubmittedEvent,
            crate::dto::events::PlayerRef,
            crate::dto::events::AnswersProgressEvent,
            crate::dto::events::LeaderboardEntry,
            crate::dto::events::FiftyFiftyEvent,
            crate::dto::events::HintEvent,
            crate::dto::events::LifelineRef,
            crate::dto::events::LifelineUsedEvent,
            crate::dto::events::SuddenDeathEvent,
            crate::dto::events::FinalResultsEvent,
            crate::dto::events::SessionRef,
            crate::dto::events::JoinedEvent,
            crate::dto::events::AdminJoinedEvent,
            crate::dto::events::ReplacedEvent,
            crate::dto::events::ErrorEvent,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::AdminAction,
            crate::state::quiz::LifelineKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "admin", description = "Session creation, questions and player administration"),
        (name = "lifecycle", description = "Question flow: start, navigation, reveal, pause"),
        (name = "leaderboard", description = "Leaderboard overlay and archived snapshots"),
        (name = "question_sets", description = "Named question set bank"),
        (name = "public", description = "Player registration and public session data"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "realtime", description = "WebSocket endpoint for players, displays and admins"),
    )
)]
pub struct ApiDoc;
