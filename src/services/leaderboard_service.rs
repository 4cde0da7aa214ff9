//! Leaderboard projections, overlay control and archived leaderboard management.

use tracing::info;

use crate::{
    dto::{
        admin::{
            ActionResponse, AdminLeaderboardEntry, LeaderboardSnapshot, SnapshotApplied,
            SnapshotList, SnapshotsCleared,
        },
        events::QuizEvent,
        public::PublicLeaderboardEntry,
    },
    error::ServiceError,
    services::dispatch::dispatch_event,
    state::{
        SharedState,
        effects::{Audience, Effects},
        transitions::{read_session, run_transition},
    },
};

/// Ranked roster with connection state for admin screens.
pub async fn admin_leaderboard(
    state: &SharedState,
    code: &str,
) -> Result<Vec<AdminLeaderboardEntry>, ServiceError> {
    let hub = state.hubs().existing(code);
    let online = |player_id: &str| hub.as_ref().is_some_and(|hub| hub.is_player_online(player_id));
    read_session(state, code, |session, _now| {
        session
            .leaderboard()
            .into_iter()
            .map(|entry| AdminLeaderboardEntry {
                online: online(&entry.id),
                id: entry.id,
                name: entry.name,
                email: entry.email,
                score: entry.score,
                participant_code: entry.participant_code,
                firsts: entry.firsts,
                cum_time: entry.cum_time,
            })
            .collect()
    })
    .await
}

/// Names and scores only.
pub async fn public_leaderboard(
    state: &SharedState,
    code: &str,
) -> Result<Vec<PublicLeaderboardEntry>, ServiceError> {
    read_session(state, code, |session, _now| {
        session
            .leaderboard()
            .into_iter()
            .map(|entry| PublicLeaderboardEntry {
                name: entry.name,
                score: entry.score,
            })
            .collect()
    })
    .await
}

/// Push the leaderboard overlay to player and display screens.
pub async fn show(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    read_session(state, code, |session, _now| {
        dispatch_event(
            state,
            &session.id,
            Audience::Players,
            QuizEvent::LeaderboardShow(session.leaderboard()),
        );
    })
    .await?;
    Ok(ActionResponse::ok())
}

pub async fn hide(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    read_session(state, code, |session, _now| {
        dispatch_event(state, &session.id, Audience::Players, QuizEvent::LeaderboardHide {});
    })
    .await?;
    Ok(ActionResponse::ok())
}

/// Zero every score and statistic, broadcast the result and drop the overlay.
pub async fn reset_scores(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    run_transition(state, code, |session, _now| {
        session.reset_scores();
        let mut effects = Effects::default();
        effects.emit_everyone(QuizEvent::Leaderboard(session.leaderboard()));
        effects.emit(Audience::Players, QuizEvent::LeaderboardHide {});
        Ok::<_, ServiceError>((ActionResponse::ok(), effects))
    })
    .await?;
    info!(session = %code, "scores reset");
    Ok(ActionResponse::ok())
}

/// Archived leaderboards of a session, newest first.
pub async fn list_snapshots(state: &SharedState, code: &str) -> Result<SnapshotList, ServiceError> {
    let handle = state.session(code)?;
    let code = handle.session().read().await.id.clone();
    let items = state
        .store()
        .list_leaderboard_snapshots(Some(code))
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(SnapshotList { items })
}

pub async fn load_snapshot(state: &SharedState, file: &str) -> Result<LeaderboardSnapshot, ServiceError> {
    state
        .store()
        .load_leaderboard_snapshot(file.to_string())
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("snapshot `{file}` not found")))
}

/// Restore scores from an archived leaderboard, matching players on participant code.
pub async fn apply_snapshot(
    state: &SharedState,
    code: &str,
    file: &str,
) -> Result<SnapshotApplied, ServiceError> {
    state.session(code)?;
    let snapshot = load_snapshot(state, file).await?;
    let response = run_transition(state, code, move |session, _now| {
        let matched = session.apply_score_snapshot(
            snapshot
                .leaderboard
                .iter()
                .map(|row| (row.participant_code.as_str(), row.score)),
        );
        let mut effects = Effects::default();
        effects.emit_everyone(QuizEvent::Leaderboard(session.leaderboard()));
        let applied = session.players.len();
        Ok::<_, ServiceError>((
            SnapshotApplied {
                ok: true,
                matched,
                applied,
            },
            effects,
        ))
    })
    .await?;
    info!(session = %code, snapshot = %file, matched = response.matched, "snapshot applied");
    Ok(response)
}

/// Delete every archived leaderboard of a session.
pub async fn clear_snapshots(state: &SharedState, code: &str) -> Result<SnapshotsCleared, ServiceError> {
    let handle = state.session(code)?;
    let code = handle.session().read().await.id.clone();
    let deleted = state
        .store()
        .delete_leaderboard_snapshots(Some(code.clone()))
        .await?;
    info!(session = %code, deleted, "snapshots cleared");
    Ok(SnapshotsCleared { ok: true, deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::public::RegisterRequest,
        services::{
            quiz_service,
            test_support::{TestContext, drain, names},
        },
        state::hub::{Connection, ConnectionRole},
    };

    async fn with_players() -> TestContext {
        let ctx = TestContext::with_default_session().await;
        for (name, email) in [("Ann", "ann@example.com"), ("Bob", "bob@example.com")] {
            quiz_service::register(
                &ctx.state,
                "GLOBAL",
                RegisterRequest {
                    name: name.into(),
                    email: email.into(),
                },
            )
            .await
            .unwrap();
        }
        ctx
    }

    async fn set_score(ctx: &TestContext, email: &str, score: i64) {
        run_transition(&ctx.state, "GLOBAL", |session, _now| {
            for player in session.players.values_mut() {
                if player.participant_code == email {
                    player.score = score;
                }
            }
            Ok::<_, ServiceError>(((), Effects::default()))
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn projections_rank_players() {
        let ctx = with_players().await;
        set_score(&ctx, "bob@example.com", 500).await;

        let public = public_leaderboard(&ctx.state, "GLOBAL").await.unwrap();
        assert_eq!(public[0].name, "Bob");
        assert_eq!(public[0].score, 500);

        let admin = admin_leaderboard(&ctx.state, "GLOBAL").await.unwrap();
        assert_eq!(admin.len(), 2);
        assert!(admin.iter().all(|row| !row.online));

        assert!(admin_leaderboard(&ctx.state, "missing").await.is_err());
        assert!(ctx.state.hubs().is_empty());
    }

    #[tokio::test]
    async fn reset_zeroes_scores_and_hides_overlay() {
        let ctx = with_players().await;
        set_score(&ctx, "ann@example.com", 300).await;
        let (id, tx, mut rx) = ctx.socket();
        ctx.state.hubs().session("GLOBAL").register(Connection {
            id,
            role: ConnectionRole::Display,
            tx,
        });

        reset_scores(&ctx.state, "GLOBAL").await.unwrap();

        let frames = drain(&mut rx);
        assert_eq!(names(&frames), vec!["leaderboard", "leaderboard_hide"]);
        let board = public_leaderboard(&ctx.state, "GLOBAL").await.unwrap();
        assert!(board.iter().all(|row| row.score == 0));
    }

    #[tokio::test]
    async fn show_and_hide_reach_displays() {
        let ctx = with_players().await;
        let (id, tx, mut rx) = ctx.socket();
        ctx.state.hubs().session("GLOBAL").register(Connection {
            id,
            role: ConnectionRole::Display,
            tx,
        });
        show(&ctx.state, "GLOBAL").await.unwrap();
        hide(&ctx.state, "GLOBAL").await.unwrap();
        let frames = drain(&mut rx);
        assert_eq!(names(&frames), vec!["leaderboard_show", "leaderboard_hide"]);
        assert_eq!(frames[0].1.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn snapshots_can_be_applied_and_cleared() {
        let ctx = with_players().await;
        set_score(&ctx, "ann@example.com", 700).await;
        let rows = ctx
            .state
            .registry()
            .get("GLOBAL")
            .unwrap()
            .session()
            .read()
            .await
            .leaderboard();
        let snapshot_id = ctx
            .state
            .store()
            .save_leaderboard_snapshot(
                "GLOBAL".into(),
                rows.into_iter().map(Into::into).collect(),
            )
            .await
            .unwrap();

        reset_scores(&ctx.state, "GLOBAL").await.unwrap();
        let listed = list_snapshots(&ctx.state, "GLOBAL").await.unwrap();
        assert_eq!(listed.items.len(), 1);

        let applied = apply_snapshot(&ctx.state, "GLOBAL", &snapshot_id).await.unwrap();
        assert_eq!(applied.matched, 2);
        assert_eq!(applied.applied, 2);
        let board = public_leaderboard(&ctx.state, "GLOBAL").await.unwrap();
        assert_eq!(board[0].name, "Ann");
        assert_eq!(board[0].score, 700);

        assert!(matches!(
            load_snapshot(&ctx.state, "GLOBAL_missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(clear_snapshots(&ctx.state, "GLOBAL").await.unwrap().deleted, 1);
    }
}
