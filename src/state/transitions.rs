//! Single-writer execution of session operations.

use crate::{
    dao::models::SessionEntity,
    error::ServiceError,
    services::{
        dispatch::dispatch_effects,
        persistence::{archive_leaderboard, persist_session},
    },
    state::{SharedState, effects::Effects, quiz::QuizSession, timing::Timestamp},
};

/// Run `work` under the session's write lock, deliver its notifications in order while
/// the lock is held, then write the session through to storage once the lock is released.
///
/// Failed work leaves the session untouched and emits nothing.
pub async fn run_transition<T, E, F>(
    state: &SharedState,
    session_id: &str,
    work: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(&mut QuizSession, Timestamp) -> Result<(T, Effects), E>,
    E: Into<ServiceError>,
{
    attempt_transition(state, session_id, work)
        .await?
        .map_err(Into::into)
}

/// Like [`run_transition`], but hands a refusal from `work` back to the caller untouched.
///
/// The outer error only reports an unknown session. A refused attempt is neither counted
/// as a revision nor persisted.
pub async fn attempt_transition<T, E, F>(
    state: &SharedState,
    session_id: &str,
    work: F,
) -> Result<Result<T, E>, ServiceError>
where
    F: FnOnce(&mut QuizSession, Timestamp) -> Result<(T, Effects), E>,
{
    attempt_update(state, session_id, |session, now| {
        work(session, now).map(|(value, effects)| (value, effects, true))
    })
    .await
}

/// Like [`attempt_transition`], with `work` telling whether it changed the session.
///
/// Effects are always delivered, but an unchanged session keeps its revision and is not
/// written to storage.
pub async fn attempt_update<T, E, F>(
    state: &SharedState,
    session_id: &str,
    work: F,
) -> Result<Result<T, E>, ServiceError>
where
    F: FnOnce(&mut QuizSession, Timestamp) -> Result<(T, Effects, bool), E>,
{
    let handle = state.session(session_id)?;

    let (value, committed, audit) = {
        let mut session = handle.session().write().await;
        let now = state.now();
        let (value, effects, changed) = match work(&mut session, now) {
            Ok(done) => done,
            Err(refused) => return Ok(Err(refused)),
        };
        if changed {
            session.revision += 1;
        }
        dispatch_effects(state, &session.id, &effects.events);
        let committed = changed.then(|| (SessionEntity::from(&*session), session.revision));
        (value, committed, effects.audit_snapshot)
    };

    if let Some((entity, revision)) = committed {
        let code = entity.code.clone();
        persist_session(state, &handle, entity, revision).await;
        if let Some(rows) = audit {
            archive_leaderboard(state, &code, rows).await;
        }
    }
    Ok(Ok(value))
}

/// Run a read-only projection against a consistent view of the session.
pub async fn read_session<T, F>(state: &SharedState, session_id: &str, read: F) -> Result<T, ServiceError>
where
    F: FnOnce(&QuizSession, Timestamp) -> T,
{
    let handle = state.session(session_id)?;
    let session = handle.session().read().await;
    Ok(read(&session, state.now()))
}
