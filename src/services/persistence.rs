//! Best-effort write-through of session state and leaderboard archives.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dao::models::SessionEntity,
    dto::events::LeaderboardEntry,
    state::{AppState, registry::SessionHandle},
};

/// Save a session snapshot unless a newer revision already reached storage, or the
/// session was removed from the registry meanwhile. Failures are logged and discarded.
pub async fn persist_session(
    state: &AppState,
    handle: &SessionHandle,
    entity: SessionEntity,
    revision: u64,
) {
    let code = entity.code.clone();
    let mut persisted = handle.persisted_revision().lock().await;
    if persisted.is_some_and(|stored| stored >= revision) {
        debug!(session = %code, revision, "newer snapshot already persisted");
        return;
    }
    let still_registered = state
        .registry()
        .get(&code)
        .is_some_and(|current| Arc::ptr_eq(&current, handle));
    if !still_registered {
        debug!(session = %code, "session removed; snapshot dropped");
        return;
    }

    match state.store().save_session(entity).await {
        Ok(()) => *persisted = Some(revision),
        Err(err) => warn!(session = %code, revision, error = %err, "failed to persist session"),
    }
}

/// Archive a ranked leaderboard. Failures are logged and discarded.
pub async fn archive_leaderboard(state: &AppState, code: &str, rows: Vec<LeaderboardEntry>) {
    let rows = rows.into_iter().map(Into::into).collect();
    match state
        .store()
        .save_leaderboard_snapshot(code.to_string(), rows)
        .await
    {
        Ok(snapshot_id) => debug!(session = %code, snapshot = %snapshot_id, "leaderboard archived"),
        Err(err) => warn!(session = %code, error = %err, "failed to archive leaderboard"),
    }
}
