//! Session management: creation, questions, question-set bank, registration and settings.

use tracing::{info, warn};

use crate::{
    dao::models::SessionEntity,
    dto::{
        admin::{
            AllowedEmailsRequest, AllowedEmailsResponse, CreateQuizResponse, DeleteQuizResponse,
            DisconnectResponse,
            LifelinesRequest, LifelinesResponse, QuestionInput, QuestionSetItem, QuestionSetList,
            QuestionSetSaveRequest, QuestionSetSaved, QuestionsPayload,
        },
        events::{QuizEvent, SessionRef, StatusEvent},
        public::{RegisterRequest, RegisterResponse},
        validation::validate_question_list,
    },
    error::ServiceError,
    services::{dispatch::dispatch_event, persistence::persist_session},
    state::{
        SharedState,
        effects::{Audience, Effects},
        quiz::{Question, QuizSession},
        transitions::{read_session, run_transition},
    },
};

/// Load every stored session into the registry. Unreadable snapshots were already skipped.
pub async fn hydrate(state: &SharedState) -> Result<usize, ServiceError> {
    let sessions = state.store().load_all_sessions().await?;
    let count = state
        .registry()
        .hydrate(sessions.into_iter().map(QuizSession::from));
    info!(count, "sessions restored from storage");
    Ok(count)
}

/// Return the session `code` (default session when `None`), creating and persisting it if new.
pub async fn create_session(
    state: &SharedState,
    code: Option<&str>,
) -> Result<CreateQuizResponse, ServiceError> {
    let code = state.resolve_session_id(code)?;
    let lifelines = state.config().default_lifelines_enabled();
    let (handle, created) = state
        .registry()
        .get_or_create(&code, |id| QuizSession::with_lifelines(id, lifelines));
    if created {
        let (entity, revision) = {
            let session = handle.session().read().await;
            (SessionEntity::from(&*session), session.revision)
        };
        persist_session(state, &handle, entity, revision).await;
        info!(session = %code, "session created");
    }
    Ok(CreateQuizResponse { code })
}

/// Replace the questions of a session wholesale.
pub async fn upload_questions(
    state: &SharedState,
    code: &str,
    payload: QuestionsPayload,
) -> Result<usize, ServiceError> {
    let questions: Vec<Question> = payload.questions.into_iter().map(Into::into).collect();
    run_transition(state, code, move |session, _now| {
        session.replace_questions(questions);
        Ok::<_, ServiceError>((session.questions.len(), Effects::default()))
    })
    .await
}

/// Current questions of a session, answers and hints included.
pub async fn export_questions(state: &SharedState, code: &str) -> Result<QuestionsPayload, ServiceError> {
    read_session(state, code, |session, _now| QuestionsPayload {
        questions: session.questions.iter().map(QuestionInput::from).collect(),
    })
    .await
}

pub async fn list_question_sets(state: &SharedState) -> Result<QuestionSetList, ServiceError> {
    let items = state
        .store()
        .list_question_sets()
        .await?
        .into_iter()
        .map(|item| QuestionSetItem {
            name: item.name,
            count: item.count,
        })
        .collect();
    Ok(QuestionSetList { items })
}

pub async fn save_question_set(
    state: &SharedState,
    request: QuestionSetSaveRequest,
) -> Result<QuestionSetSaved, ServiceError> {
    let questions = request
        .questions
        .into_iter()
        .map(|input| Question::from(input).into())
        .collect();
    let file = state
        .store()
        .save_question_set(request.name, questions)
        .await?;
    Ok(QuestionSetSaved { ok: true, file })
}

/// Read a stored question set, rejecting one that no longer validates.
pub async fn load_question_set(state: &SharedState, name: &str) -> Result<QuestionsPayload, ServiceError> {
    let stored = state
        .store()
        .load_question_set(name.to_string())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question set `{name}` not found")))?;
    let payload = QuestionsPayload {
        questions: stored
            .into_iter()
            .map(|entity| QuestionInput::from(&Question::from(entity)))
            .collect(),
    };
    if let Err(err) = validate_question_list("questions", &payload.questions) {
        warn!(set = %name, error = %err, "stored question set is invalid");
        return Err(ServiceError::Unprocessable(format!(
            "invalid question set format: {err}"
        )));
    }
    Ok(payload)
}

pub async fn delete_question_set(state: &SharedState, name: &str) -> Result<(), ServiceError> {
    if state.store().delete_question_set(name.to_string()).await? {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("question set `{name}` not found")))
    }
}

/// Replace the session questions with a stored set.
pub async fn apply_question_set(state: &SharedState, code: &str, name: &str) -> Result<usize, ServiceError> {
    state.session(code)?;
    let payload = load_question_set(state, name).await?;
    upload_questions(state, code, payload).await
}

/// Register a player, or hand back the identity already bound to the same email.
pub async fn register(
    state: &SharedState,
    code: &str,
    request: RegisterRequest,
) -> Result<RegisterResponse, ServiceError> {
    let registration = run_transition(state, code, |session, _now| {
        session
            .register(&request.name, &request.email)
            .map(|registration| (registration, Effects::default()))
    })
    .await?;
    if registration.created {
        info!(session = %code, player_id = %registration.player_id, "player registered");
    }
    Ok(RegisterResponse {
        player_id: registration.player_id,
        participant_code: registration.participant_code,
    })
}

/// Apply quiz-wide lifeline switches for the lifeline types this deployment knows.
pub async fn set_lifelines(
    state: &SharedState,
    code: &str,
    request: LifelinesRequest,
) -> Result<LifelinesResponse, ServiceError> {
    let known = state.config().lifeline_types.clone();
    run_transition(state, code, move |session, _now| {
        session.set_lifelines_enabled(
            request
                .lifelines
                .iter()
                .filter(|(name, _)| known.iter().any(|kind| kind.as_str() == name.as_str()))
                .map(|(name, enabled)| (name.as_str(), *enabled)),
        );
        let lifelines = session.lifelines_enabled.clone();
        let mut effects = Effects::default();
        effects.emit(Audience::Admins, QuizEvent::Lifelines(lifelines.clone()));
        Ok::<_, ServiceError>((LifelinesResponse { ok: true, lifelines }, effects))
    })
    .await
}

pub async fn allowed_emails(state: &SharedState, code: &str) -> Result<AllowedEmailsResponse, ServiceError> {
    read_session(state, code, |session, _now| AllowedEmailsResponse {
        emails: session.allowed_emails.clone(),
        count: session.allowed_emails.len(),
    })
    .await
}

pub async fn set_allowed_emails(
    state: &SharedState,
    code: &str,
    request: AllowedEmailsRequest,
) -> Result<AllowedEmailsResponse, ServiceError> {
    run_transition(state, code, move |session, _now| {
        let emails = session
            .update_allowed_emails(&request.emails, request.mode)
            .to_vec();
        let count = emails.len();
        Ok::<_, ServiceError>((AllowedEmailsResponse { emails, count }, Effects::default()))
    })
    .await
}

/// Status projection, identical to the `status` event.
pub async fn status(state: &SharedState, code: &str) -> Result<StatusEvent, ServiceError> {
    read_session(state, code, |session, now| session.status_event(now)).await
}

/// Close every player connection of a session and tell the remaining clients.
pub async fn disconnect_all(state: &SharedState, code: &str) -> Result<DisconnectResponse, ServiceError> {
    let handle = state.session(code)?;
    let code = handle.session().read().await.id.clone();
    let disconnected = state
        .hubs()
        .existing(&code)
        .map(|hub| hub.disconnect_players())
        .unwrap_or(0);
    dispatch_event(
        state,
        &code,
        Audience::Players,
        QuizEvent::Reset(SessionRef { code: code.clone() }),
    );
    info!(session = %code, disconnected, "player connections closed");
    Ok(DisconnectResponse {
        ok: true,
        disconnected,
    })
}

/// Remove a session from memory and storage and close every connection attached to it.
///
/// Leaderboard archives of the session are kept.
pub async fn delete_session(state: &SharedState, code: &str) -> Result<DeleteQuizResponse, ServiceError> {
    let handle = state
        .registry()
        .remove(code)
        .ok_or_else(|| ServiceError::NotFound(format!("quiz `{code}` not found")))?;
    let code = handle.session().read().await.id.clone();
    let disconnected = state
        .hubs()
        .remove(&code)
        .map(|hub| hub.close_all())
        .unwrap_or(0);
    if let Err(err) = state.store().delete_session(code.clone()).await {
        warn!(session = %code, error = %err, "failed to delete stored session");
    }
    info!(session = %code, disconnected, "session deleted");
    Ok(DeleteQuizResponse {
        ok: true,
        code,
        disconnected,
    })
}

/// Drop every session from memory and storage, then recreate the default one empty.
///
/// Player connections are closed everywhere. Admins and displays of the default session
/// stay attached, those of other sessions are closed with their session.
/// Stored question sets and leaderboard archives are kept.
pub async fn full_reset(state: &SharedState) -> Result<CreateQuizResponse, ServiceError> {
    let default_code = state.resolve_session_id(None)?;
    for code in state.hubs().session_ids() {
        if code == default_code {
            if let Some(hub) = state.hubs().existing(&code) {
                hub.disconnect_players();
            }
        } else if let Some(hub) = state.hubs().remove(&code) {
            hub.close_all();
        }
    }
    for code in state.registry().session_ids() {
        state.registry().remove(&code);
        if let Err(err) = state.store().delete_session(code.clone()).await {
            warn!(session = %code, error = %err, "failed to delete stored session");
        }
    }
    state.registry().clear();

    let created = create_session(state, None).await?;
    dispatch_event(state, &created.code, Audience::Players, QuizEvent::LeaderboardHide {});
    dispatch_event(
        state,
        &created.code,
        Audience::Players,
        QuizEvent::Reset(SessionRef {
            code: created.code.clone(),
        }),
    );
    info!(session = %created.code, "full reset complete");
    Ok(created)
}
