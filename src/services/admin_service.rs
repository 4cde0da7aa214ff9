//! Business logic powering the admin lifecycle routes and socket commands. Every command
//! runs as one session transition so its notifications go out in order.

use tracing::{debug, info};

use crate::{
    dto::{
        admin::{ActionResponse, CommandResponse, PauseResponse, StartRequest, SuddenDeathStartRequest},
        events::{FinalResultsEvent, QuizEvent, SuddenDeathEvent},
    },
    error::ServiceError,
    services::dispatch::dispatch_event,
    state::{
        SharedState,
        effects::{Audience, Effects},
        lifecycle::NextOutcome,
        transitions::{read_session, run_transition},
    },
};

/// Start a round at the requested index, 0 by default.
pub async fn start(
    state: &SharedState,
    code: &str,
    request: StartRequest,
) -> Result<CommandResponse, ServiceError> {
    let response = run_transition(state, code, |session, now| {
        let effects = session.start(request.index, now)?;
        Ok::<_, ServiceError>((command_response(session.status_event(now)), effects))
    })
    .await?;
    info!(session = %code, index = response.status.index, "round started");
    Ok(response)
}

pub async fn goto(state: &SharedState, code: &str, index: usize) -> Result<CommandResponse, ServiceError> {
    run_transition(state, code, |session, now| {
        let effects = session.goto(index, now)?;
        Ok::<_, ServiceError>((command_response(session.status_event(now)), effects))
    })
    .await
}

/// Reveal the current question if still open, otherwise advance.
pub async fn next(state: &SharedState, code: &str) -> Result<CommandResponse, ServiceError> {
    let max_points = state.max_points();
    let (outcome, response) = run_transition(state, code, |session, now| {
        let (outcome, effects) = session.next(now, max_points)?;
        Ok::<_, ServiceError>(((outcome, command_response(session.status_event(now))), effects))
    })
    .await?;
    match outcome {
        NextOutcome::Revealed => debug!(session = %code, "next settled the open question"),
        NextOutcome::Advanced(index) => debug!(session = %code, index, "advanced to question"),
        NextOutcome::Completed => info!(session = %code, "quiz complete"),
    }
    Ok(response)
}

/// Settle the current question. Does nothing once revealed or with nothing on screen.
pub async fn reveal(state: &SharedState, code: &str) -> Result<CommandResponse, ServiceError> {
    let max_points = state.max_points();
    run_transition(state, code, |session, now| {
        let effects = session.reveal(now, max_points);
        Ok::<_, ServiceError>((command_response(session.status_event(now)), effects))
    })
    .await
}

pub async fn toggle_pause(state: &SharedState, code: &str) -> Result<PauseResponse, ServiceError> {
    run_transition(state, code, |session, now| {
        let (paused, effects) = session.toggle_pause(now);
        Ok::<_, ServiceError>((PauseResponse { ok: true, paused }, effects))
    })
    .await
}

/// Clear questions and per-question state. Players and scores survive.
pub async fn reset(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    run_transition(state, code, |session, _now| {
        let effects = session.reset()?;
        Ok::<_, ServiceError>((ActionResponse::ok(), effects))
    })
    .await?;
    info!(session = %code, "quiz reset");
    Ok(ActionResponse::ok())
}

/// Restrict answering to a subset of players.
pub async fn start_sudden_death(
    state: &SharedState,
    code: &str,
    request: SuddenDeathStartRequest,
) -> Result<ActionResponse, ServiceError> {
    let top_n = request.top_n.and_then(|n| usize::try_from(n).ok());
    let allowed = run_transition(state, code, move |session, _now| {
        let allowed = session.start_sudden_death(request.player_ids, top_n);
        let mut effects = Effects::default();
        effects.emit_everyone(QuizEvent::SuddenDeath(SuddenDeathEvent {
            active: true,
            allowed: Some(allowed.clone()),
        }));
        Ok::<_, ServiceError>((allowed, effects))
    })
    .await?;
    info!(session = %code, players = allowed.len(), "sudden death started");
    Ok(ActionResponse::with_count(allowed.len()))
}

pub async fn stop_sudden_death(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    run_transition(state, code, |session, _now| {
        session.stop_sudden_death();
        let mut effects = Effects::default();
        effects.emit_everyone(QuizEvent::SuddenDeath(SuddenDeathEvent {
            active: false,
            allowed: None,
        }));
        Ok::<_, ServiceError>((ActionResponse::ok(), effects))
    })
    .await
}

/// Ranked results with tie-break statistics, also pushed to admin screens.
pub async fn final_results(state: &SharedState, code: &str) -> Result<FinalResultsEvent, ServiceError> {
    let results = read_session(state, code, |session, _now| session.final_results()).await?;
    dispatch_event(
        state,
        code,
        Audience::Admins,
        QuizEvent::FinalResults(results.clone()),
    );
    Ok(results)
}

fn command_response(status: crate::dto::events::StatusEvent) -> CommandResponse {
    CommandResponse { ok: true, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::admin::{ChoiceInput, QuestionInput, QuestionsPayload},
        services::{
            quiz_service,
            test_support::{TestContext, drain, names},
        },
        state::hub::{Connection, ConnectionRole},
    };

    async fn prepared() -> TestContext {
        let ctx = TestContext::with_default_session().await;
        let question = |id: &str| QuestionInput {
            id: id.into(),
            text: format!("Question {id}"),
            choices: Some(vec![
                ChoiceInput {
                    id: "a".into(),
                    text: "A".into(),
                },
                ChoiceInput {
                    id: "b".into(),
                    text: "B".into(),
                },
            ]),
            answer: Some("a".into()),
            duration: 20,
            hint: None,
        };
        quiz_service::upload_questions(
            &ctx.state,
            "GLOBAL",
            QuestionsPayload {
                questions: vec![question("q1"), question("q2")],
            },
        )
        .await
        .unwrap();
        ctx
    }

    #[tokio::test]
    async fn start_without_questions_conflicts() {
        let ctx = TestContext::with_default_session().await;
        let err = start(&ctx.state, "GLOBAL", StartRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn goto_out_of_range_is_unprocessable() {
        let ctx = prepared().await;
        let err = goto(&ctx.state, "GLOBAL", 5).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn next_reveals_then_advances_then_completes() {
        let ctx = prepared().await;
        let (id, tx, mut rx) = ctx.socket();
        ctx.state.hubs().session("GLOBAL").register(Connection {
            id,
            role: ConnectionRole::Display,
            tx,
        });

        let started = start(&ctx.state, "GLOBAL", StartRequest::default()).await.unwrap();
        assert_eq!(started.status.index, 0);
        assert_eq!(names(&drain(&mut rx)), vec!["question", "status"]);

        let revealed = next(&ctx.state, "GLOBAL").await.unwrap();
        assert!(revealed.status.revealed);
        assert_eq!(names(&drain(&mut rx)), vec!["reveal", "leaderboard", "status"]);

        let advanced = next(&ctx.state, "GLOBAL").await.unwrap();
        assert_eq!(advanced.status.index, 1);
        assert!(!advanced.status.revealed);

        next(&ctx.state, "GLOBAL").await.unwrap();
        let done = next(&ctx.state, "GLOBAL").await.unwrap();
        assert_eq!(done.status.index, 2);
        drain(&mut rx);

        let again = next(&ctx.state, "GLOBAL").await.unwrap();
        assert_eq!(again.status.index, 2);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn pause_toggles() {
        let ctx = prepared().await;
        start(&ctx.state, "GLOBAL", StartRequest::default()).await.unwrap();
        assert!(toggle_pause(&ctx.state, "GLOBAL").await.unwrap().paused);
        assert!(!toggle_pause(&ctx.state, "GLOBAL").await.unwrap().paused);
    }

    #[tokio::test]
    async fn reveal_archives_leaderboard() {
        let ctx = prepared().await;
        start(&ctx.state, "GLOBAL", StartRequest::default()).await.unwrap();
        reveal(&ctx.state, "GLOBAL").await.unwrap();
        let snapshots = ctx
            .state
            .store()
            .list_leaderboard_snapshots(Some("GLOBAL".into()))
            .await
            .unwrap();
        assert_eq!(snapshots.len(), 1);

        reveal(&ctx.state, "GLOBAL").await.unwrap();
        let snapshots = ctx
            .state
            .store()
            .list_leaderboard_snapshots(Some("GLOBAL".into()))
            .await
            .unwrap();
        assert_eq!(snapshots.len(), 1);
    }

    #[tokio::test]
    async fn sudden_death_reports_eligible_count() {
        let ctx = prepared().await;
        let response = start_sudden_death(
            &ctx.state,
            "GLOBAL",
            SuddenDeathStartRequest {
                player_ids: Some(vec!["ghost".into()]),
                top_n: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.count, Some(0));
        stop_sudden_death(&ctx.state, "GLOBAL").await.unwrap();
    }

    #[tokio::test]
    async fn reset_clears_questions() {
        let ctx = prepared().await;
        start(&ctx.state, "GLOBAL", StartRequest::default()).await.unwrap();
        reset(&ctx.state, "GLOBAL").await.unwrap();
        let status = quiz_service::status(&ctx.state, "GLOBAL").await.unwrap();
        assert_eq!(status.total, 0);
        assert_eq!(status.index, -1);
    }
}
