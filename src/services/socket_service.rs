//! Handlers for the messages a WebSocket client sends once connected.
//!
//! Replies that must stay ordered with session broadcasts are queued while the session
//! lock is held, through the hub, like any other notification.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        events::{
            AdminJoinedEvent, AnswerLockedEvent, AnswerRejectedEvent, AnswerSubmittedEvent,
            FiftyFiftyEvent, HintEvent, JoinedEvent, LifelineRef, LifelineUsedEvent, QuizEvent,
            ReplacedEvent, ServerEvent,
        },
        ws::{AdminAction, ClientMessage, answer_text},
    },
    error::ServiceError,
    services::{admin_service, dispatch::dispatch_event, leaderboard_service},
    state::{
        AppState, SharedState,
        effects::{Audience, Effects},
        hub::{Connection, ConnectionRole, SessionHub},
        lifeline::LifelineEffect,
        transitions::{attempt_transition, attempt_update, read_session},
    },
};

const MISSING_JOIN_FIELDS: &str = "Missing code, name, or playerId";
const INVALID_SESSION_OR_PLAYER: &str = "Invalid session or player";
const NOT_IN_QUIZ: &str = "Not in quiz";
const MISSING_LIFELINE: &str = "Missing lifeline or not in quiz";
const UNAUTHORIZED: &str = "Unauthorized";
const UNKNOWN_SESSION: &str = "Unknown session";
const REPLACED_REASON: &str = "Another tab connected";

/// Session and role a socket identified as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub session_id: String,
    pub role: ConnectionRole,
}

/// Server-side handle of one WebSocket client.
pub struct ClientSocket {
    id: Uuid,
    tx: mpsc::UnboundedSender<Message>,
    identity: Option<Identity>,
}

impl ClientSocket {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
            identity: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Queue an event straight onto this socket, bypassing the hub.
    pub fn reply(&self, event: &QuizEvent) -> bool {
        match ServerEvent::from_quiz_event(event) {
            Ok(frame) => self.tx.send(Message::Text(frame.data.into())).is_ok(),
            Err(err) => {
                warn!(connection = %self.id, event = event.name(), error = %err, "failed to serialize reply");
                false
            }
        }
    }

    /// Detach from the hub the socket joined, if any.
    pub fn leave(&mut self, state: &AppState) {
        if let Some(identity) = self.identity.take() {
            if let Some(hub) = state.hubs().existing(&identity.session_id) {
                hub.unregister(self.id);
            }
        }
    }

    fn connection(&self, role: ConnectionRole) -> Connection {
        Connection {
            id: self.id,
            role,
            tx: self.tx.clone(),
        }
    }

    fn current_hub(&self, state: &AppState) -> Option<std::sync::Arc<SessionHub>> {
        self.identity
            .as_ref()
            .and_then(|identity| state.hubs().existing(&identity.session_id))
    }

    /// Move the socket into `hub` under `role`, leaving the hub it was in before.
    fn attach(&self, previous: Option<&SessionHub>, hub: &SessionHub, role: ConnectionRole) {
        if let Some(previous) = previous {
            previous.unregister(self.id);
        }
        if let Some(displaced) = hub.register(self.connection(role)) {
            displace(displaced);
        }
    }
}

/// Tell a connection it lost its player to a newer one, then close it.
fn displace(connection: Connection) {
    let replaced = QuizEvent::Replaced(ReplacedEvent {
        reason: REPLACED_REASON.into(),
    });
    if let Ok(frame) = ServerEvent::from_quiz_event(&replaced) {
        connection.send(&frame);
    }
    connection.close();
    debug!(connection = %connection.id, "player connection replaced");
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Route one parsed client message.
pub async fn handle_message(state: &SharedState, socket: &mut ClientSocket, message: ClientMessage) {
    match message {
        ClientMessage::JoinQuiz {
            session_id,
            player_id,
            name,
            email,
        } => join_quiz(state, socket, session_id, player_id, name, email).await,
        ClientMessage::DisplayJoin { session_id } => display_join(state, socket, session_id).await,
        ClientMessage::AdminJoin { session_id, token } => {
            admin_join(state, socket, session_id, token).await
        }
        ClientMessage::SubmitAnswer { answer } => {
            submit_answer(state, socket, answer_text(&answer)).await
        }
        ClientMessage::LifelineRequest { lifeline } => lifeline_request(state, socket, lifeline).await,
        ClientMessage::AdminCommand { action } => admin_command(state, socket, action).await,
        ClientMessage::Unknown => debug!(connection = %socket.id(), "ignoring unknown message type"),
    }
}

/// Bind the socket to a registered player and replay what the player missed.
pub async fn join_quiz(
    state: &SharedState,
    socket: &mut ClientSocket,
    session_id: Option<String>,
    player_id: Option<String>,
    name: Option<String>,
    email: Option<String>,
) {
    let (Some(player_id), Some(_)) = (non_blank(player_id), non_blank(name)) else {
        socket.reply(&QuizEvent::error(MISSING_JOIN_FIELDS));
        return;
    };
    let Ok(code) = state.resolve_session_id(session_id.as_deref()) else {
        socket.reply(&QuizEvent::error(INVALID_SESSION_OR_PLAYER));
        return;
    };
    let previous = socket.current_hub(state);
    let max_points = state.max_points();
    let connection_id = socket.id();
    let socket_ref = &*socket;

    let outcome = attempt_update(state, &code, |session, now| {
        if !session.players.contains_key(&player_id) {
            return Err(());
        }
        let changed = session.sync_identity(&player_id, email.as_deref());
        let hub = state.hubs().session(&session.id);
        socket_ref.attach(
            previous.as_deref(),
            &hub,
            ConnectionRole::Player(player_id.clone()),
        );

        let participant_code = session
            .players
            .get(&player_id)
            .map(|player| player.participant_code.clone())
            .unwrap_or_default();
        let mut effects = Effects::default();
        let to_socket = Audience::Connection(connection_id);
        effects.emit(
            to_socket.clone(),
            QuizEvent::Joined(JoinedEvent {
                ok: true,
                participant_code,
            }),
        );
        for event in session.replay_for_player(&player_id, now, max_points) {
            effects.emit(to_socket.clone(), event);
        }
        if session.is_active {
            effects.emit(Audience::Admins, QuizEvent::AnswersProgress(session.answers_progress()));
        }
        Ok(((), effects, changed))
    })
    .await;

    match outcome {
        Ok(Ok(())) => {
            info!(session = %code, player_id = %player_id, connection = %connection_id, "player joined");
            socket.identity = Some(Identity {
                session_id: code,
                role: ConnectionRole::Player(player_id),
            });
        }
        Ok(Err(())) | Err(_) => {
            socket.reply(&QuizEvent::error(INVALID_SESSION_OR_PLAYER));
        }
    }
}

/// Subscribe a display screen to player broadcasts, with the current question if any.
pub async fn display_join(state: &SharedState, socket: &mut ClientSocket, session_id: Option<String>) {
    let Ok(code) = state.resolve_session_id(session_id.as_deref()) else {
        socket.reply(&QuizEvent::error(UNKNOWN_SESSION));
        return;
    };
    let previous = socket.current_hub(state);
    let connection_id = socket.id();
    let socket_ref = &*socket;

    let replayed = read_session(state, &code, |session, now| {
        let hub = state.hubs().session(&session.id);
        socket_ref.attach(previous.as_deref(), &hub, ConnectionRole::Display);
        for event in session.replay_for_display(now) {
            dispatch_event(state, &code, Audience::Connection(connection_id), event);
        }
    })
    .await;
    if replayed.is_err() {
        socket.reply(&QuizEvent::error(UNKNOWN_SESSION));
        return;
    }

    debug!(session = %code, connection = %connection_id, "display joined");
    socket.identity = Some(Identity {
        session_id: code,
        role: ConnectionRole::Display,
    });
}

/// Promote the socket to an admin connection when the token matches.
pub async fn admin_join(
    state: &SharedState,
    socket: &mut ClientSocket,
    session_id: Option<String>,
    token: Option<String>,
) {
    if !token.as_deref().is_some_and(|token| state.is_admin_token(token)) {
        warn!(connection = %socket.id(), "admin join with invalid token");
        socket.reply(&QuizEvent::error(UNAUTHORIZED));
        return;
    }
    let Ok(code) = state.resolve_session_id(session_id.as_deref()) else {
        socket.reply(&QuizEvent::error(UNKNOWN_SESSION));
        return;
    };
    let previous = socket.current_hub(state);
    let connection_id = socket.id();
    let socket_ref = &*socket;

    let joined = read_session(state, &code, |session, _now| {
        let hub = state.hubs().session(&session.id);
        socket_ref.attach(previous.as_deref(), &hub, ConnectionRole::Admin);
        let to_socket = Audience::Connection(connection_id);
        dispatch_event(state, &code, to_socket.clone(), QuizEvent::AdminJoined(AdminJoinedEvent { ok: true }));
        dispatch_event(state, &code, to_socket, QuizEvent::AnswersProgress(session.answers_progress()));
    })
    .await;
    if joined.is_err() {
        socket.reply(&QuizEvent::error(UNKNOWN_SESSION));
        return;
    }

    info!(session = %code, connection = %connection_id, "admin joined");
    socket.identity = Some(Identity {
        session_id: code,
        role: ConnectionRole::Admin,
    });
}

fn joined_player(socket: &ClientSocket) -> Option<(String, String)> {
    match socket.identity() {
        Some(Identity {
            session_id,
            role: ConnectionRole::Player(player_id),
        }) => Some((session_id.clone(), player_id.clone())),
        _ => None,
    }
}

/// Lock the player's answer for the current question.
pub async fn submit_answer(state: &SharedState, socket: &mut ClientSocket, answer: String) {
    let Some((code, player_id)) = joined_player(socket) else {
        socket.reply(&QuizEvent::error(NOT_IN_QUIZ));
        return;
    };
    let connection_id = socket.id();

    let outcome = attempt_transition(state, &code, |session, now| {
        let locked = session.submit_answer(&player_id, answer, now)?.value.clone();
        let name = session
            .players
            .get(&player_id)
            .map(|player| player.name.clone())
            .unwrap_or_else(|| "?".into());

        let mut effects = Effects::default();
        effects.emit(
            Audience::Admins,
            QuizEvent::AnswerSubmitted(AnswerSubmittedEvent {
                player_id: player_id.clone(),
                name,
            }),
        );
        effects.emit(
            Audience::Connection(connection_id),
            QuizEvent::AnswerLocked(AnswerLockedEvent {
                locked: true,
                answer: locked,
            }),
        );
        effects.emit(Audience::Admins, QuizEvent::AnswersProgress(session.answers_progress()));
        Ok(((), effects))
    })
    .await;

    match outcome {
        Ok(Ok(())) => debug!(session = %code, player_id = %player_id, "answer locked"),
        Ok(Err(reason)) => {
            debug!(session = %code, player_id = %player_id, %reason, "answer rejected");
            socket.reply(&QuizEvent::AnswerRejected(AnswerRejectedEvent { reason }));
        }
        Err(err) => debug!(session = %code, error = %err, "answer for a vanished session"),
    }
}

/// Consume a lifeline and deliver its effect to the requesting player.
pub async fn lifeline_request(state: &SharedState, socket: &mut ClientSocket, lifeline: Option<String>) {
    let (Some((code, player_id)), Some(requested)) = (joined_player(socket), non_blank(lifeline)) else {
        socket.reply(&QuizEvent::error(MISSING_LIFELINE));
        return;
    };
    let connection_id = socket.id();

    let outcome = attempt_transition(state, &code, |session, _now| {
        let grant = session
            .use_lifeline(&player_id, &requested, state.picker())
            .ok_or(())?;
        let to_socket = Audience::Connection(connection_id);
        let mut effects = Effects::default();
        effects.emit(
            Audience::Admins,
            QuizEvent::LifelineUsed(LifelineUsedEvent {
                player_id: player_id.clone(),
                name: grant.player_name.clone(),
                lifeline: grant.kind.as_str().to_string(),
            }),
        );
        if let Some(player) = session.players.get(&player_id) {
            effects.emit(to_socket.clone(), QuizEvent::LifelineStatus(player.lifelines.clone()));
        }
        let effect = match grant.effect {
            LifelineEffect::FiftyFifty { keep_ids } => {
                QuizEvent::LifelineFiftyFifty(FiftyFiftyEvent { keep_ids })
            }
            LifelineEffect::Hint { hint } => QuizEvent::LifelineHint(HintEvent { hint }),
            LifelineEffect::Acknowledged(kind) => QuizEvent::LifelineAck(LifelineRef {
                lifeline: kind.as_str().to_string(),
            }),
        };
        effects.emit(to_socket, effect);
        Ok(((), effects))
    })
    .await;

    match outcome {
        Ok(Ok(())) => info!(session = %code, player_id = %player_id, lifeline = %requested, "lifeline used"),
        Ok(Err(())) => {
            socket.reply(&QuizEvent::LifelineDenied(LifelineRef { lifeline: requested }));
        }
        Err(err) => debug!(session = %code, error = %err, "lifeline for a vanished session"),
    }
}

/// Run a lifecycle shortcut from an admin socket.
pub async fn admin_command(state: &SharedState, socket: &mut ClientSocket, action: AdminAction) {
    let code = match socket.identity() {
        Some(Identity {
            session_id,
            role: ConnectionRole::Admin,
        }) => session_id.clone(),
        _ => {
            socket.reply(&QuizEvent::error(UNAUTHORIZED));
            return;
        }
    };

    let result: Result<(), ServiceError> = match action {
        AdminAction::Next => admin_service::next(state, &code).await.map(drop),
        AdminAction::Pause => admin_service::toggle_pause(state, &code).await.map(drop),
        AdminAction::Reveal => admin_service::reveal(state, &code).await.map(drop),
        AdminAction::ShowLeaderboard => leaderboard_service::show(state, &code).await.map(drop),
        AdminAction::HideLeaderboard => leaderboard_service::hide(state, &code).await.map(drop),
        AdminAction::Unknown => {
            debug!(session = %code, "ignoring unknown admin action");
            Ok(())
        }
    };
    if let Err(err) = result {
        debug!(session = %code, ?action, error = %err, "admin command failed");
        socket.reply(&QuizEvent::error(err.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::{
            admin::{ChoiceInput, LifelinesRequest, QuestionInput, QuestionsPayload, StartRequest},
            public::RegisterRequest,
        },
        services::{
            quiz_service,
            test_support::{TestContext, drain, names},
        },
    };

    async fn quiz_with_player() -> (TestContext, String) {
        let ctx = TestContext::with_default_session().await;
        quiz_service::upload_questions(
            &ctx.state,
            "GLOBAL",
            QuestionsPayload {
                questions: vec![QuestionInput {
                    id: "q1".into(),
                    text: "Pick a".into(),
                    choices: Some(vec![
                        ChoiceInput {
                            id: "a".into(),
                            text: "A".into(),
                        },
                        ChoiceInput {
                            id: "b".into(),
                            text: "B".into(),
                        },
                        ChoiceInput {
                            id: "c".into(),
                            text: "C".into(),
                        },
                    ]),
                    answer: Some("a".into()),
                    duration: 20,
                    hint: Some("first letter".into()),
                }],
            },
        )
        .await
        .unwrap();
        let registered = quiz_service::register(
            &ctx.state,
            "GLOBAL",
            RegisterRequest {
                name: "Ann".into(),
                email: "ann@example.com".into(),
            },
        )
        .await
        .unwrap();
        (ctx, registered.player_id)
    }

    async fn joined(
        ctx: &TestContext,
        player_id: &str,
    ) -> (ClientSocket, mpsc::UnboundedReceiver<Message>) {
        let (_, tx, rx) = ctx.socket();
        let mut socket = ClientSocket::new(tx);
        join_quiz(
            &ctx.state,
            &mut socket,
            None,
            Some(player_id.into()),
            Some("Ann".into()),
            None,
        )
        .await;
        (socket, rx)
    }

    #[tokio::test]
    async fn join_requires_player_and_name() {
        let (ctx, _) = quiz_with_player().await;
        let (_, tx, mut rx) = ctx.socket();
        let mut socket = ClientSocket::new(tx);
        join_quiz(&ctx.state, &mut socket, None, None, Some("Ann".into()), None).await;
        join_quiz(&ctx.state, &mut socket, None, Some("ghost".into()), Some("Ann".into()), None).await;
        let frames = drain(&mut rx);
        assert_eq!(names(&frames), vec!["error", "error"]);
        assert_eq!(frames[0].1["message"], MISSING_JOIN_FIELDS);
        assert_eq!(frames[1].1["message"], INVALID_SESSION_OR_PLAYER);
        assert!(socket.identity().is_none());
    }

    #[tokio::test]
    async fn late_join_replays_current_question() {
        let (ctx, player_id) = quiz_with_player().await;
        admin_service::start(&ctx.state, "GLOBAL", StartRequest::default())
            .await
            .unwrap();

        let (socket, mut rx) = joined(&ctx, &player_id).await;
        assert!(socket.identity().is_some());
        let frames = drain(&mut rx);
        assert_eq!(
            names(&frames),
            vec!["joined", "lifeline_status", "question", "status"]
        );
        assert_eq!(frames[0].1["participantCode"], "ann@example.com");
        assert!(frames[2].1["question"]["answer"].is_null());
    }

    #[tokio::test]
    async fn second_tab_replaces_first() {
        let (ctx, player_id) = quiz_with_player().await;
        let (_first, mut first_rx) = joined(&ctx, &player_id).await;
        drain(&mut first_rx);
        let (_second, mut second_rx) = joined(&ctx, &player_id).await;

        let mut replaced = false;
        let mut closed = false;
        while let Ok(message) = first_rx.try_recv() {
            match message {
                Message::Text(text) => replaced |= text.as_str().contains("replaced"),
                Message::Close(_) => closed = true,
                _ => {}
            }
        }
        assert!(replaced && closed);
        assert_eq!(names(&drain(&mut second_rx))[0], "joined");
    }

    #[tokio::test]
    async fn answers_lock_once() {
        let (ctx, player_id) = quiz_with_player().await;
        admin_service::start(&ctx.state, "GLOBAL", StartRequest::default())
            .await
            .unwrap();
        let (mut socket, mut rx) = joined(&ctx, &player_id).await;
        drain(&mut rx);

        submit_answer(&ctx.state, &mut socket, "a".into()).await;
        submit_answer(&ctx.state, &mut socket, "b".into()).await;
        let frames = drain(&mut rx);
        assert_eq!(names(&frames), vec!["answer_locked", "answer_rejected"]);
        assert_eq!(frames[0].1["answer"], "a");
        assert_eq!(frames[1].1["reason"], "already_locked");
    }

    #[tokio::test]
    async fn submit_before_join_is_refused() {
        let (ctx, _) = quiz_with_player().await;
        let (_, tx, mut rx) = ctx.socket();
        let mut socket = ClientSocket::new(tx);
        submit_answer(&ctx.state, &mut socket, "a".into()).await;
        let frames = drain(&mut rx);
        assert_eq!(frames[0].1["message"], NOT_IN_QUIZ);
    }

    #[tokio::test]
    async fn fifty_fifty_then_denied() {
        let (ctx, player_id) = quiz_with_player().await;
        admin_service::start(&ctx.state, "GLOBAL", StartRequest::default())
            .await
            .unwrap();
        let (mut socket, mut rx) = joined(&ctx, &player_id).await;
        drain(&mut rx);

        lifeline_request(&ctx.state, &mut socket, Some("5050".into())).await;
        lifeline_request(&ctx.state, &mut socket, Some("5050".into())).await;
        let frames = drain(&mut rx);
        assert_eq!(
            names(&frames),
            vec!["lifeline_status", "lifeline_5050", "lifeline_denied"]
        );
        assert_eq!(frames[1].1["keepIds"], serde_json::json!(["a", "b"]));
    }

    #[tokio::test]
    async fn disabled_lifeline_is_denied() {
        let (ctx, player_id) = quiz_with_player().await;
        quiz_service::set_lifelines(
            &ctx.state,
            "GLOBAL",
            LifelinesRequest {
                lifelines: [("hint".to_string(), false)].into_iter().collect(),
            },
        )
        .await
        .unwrap();
        let (mut socket, mut rx) = joined(&ctx, &player_id).await;
        drain(&mut rx);
        lifeline_request(&ctx.state, &mut socket, Some("hint".into())).await;
        assert_eq!(names(&drain(&mut rx)), vec!["lifeline_denied"]);
    }

    #[tokio::test]
    async fn admin_socket_needs_token() {
        let (ctx, _) = quiz_with_player().await;
        let (_, tx, mut rx) = ctx.socket();
        let mut socket = ClientSocket::new(tx);

        admin_command(&ctx.state, &mut socket, AdminAction::Next).await;
        admin_join(&ctx.state, &mut socket, None, Some("wrong".into())).await;
        admin_join(&ctx.state, &mut socket, None, Some("secret".into())).await;
        let frames = drain(&mut rx);
        assert_eq!(
            names(&frames),
            vec!["error", "error", "admin_joined", "answers_progress"]
        );

        admin_command(&ctx.state, &mut socket, AdminAction::Next).await;
        let frames = drain(&mut rx);
        assert!(names(&frames).contains(&"question"));
    }

    #[tokio::test]
    async fn display_gets_current_question() {
        let (ctx, _) = quiz_with_player().await;
        admin_service::start(&ctx.state, "GLOBAL", StartRequest::default())
            .await
            .unwrap();
        let (_, tx, mut rx) = ctx.socket();
        let mut socket = ClientSocket::new(tx);
        display_join(&ctx.state, &mut socket, Some("global".into())).await;
        assert_eq!(names(&drain(&mut rx)), vec!["question", "status"]);

        socket.leave(&ctx.state);
        assert_eq!(ctx.state.hubs().session("GLOBAL").connection_count(), 0);
    }

    #[tokio::test]
    async fn unknown_sessions_get_no_hub() {
        let (ctx, _) = quiz_with_player().await;
        let before = ctx.state.hubs().len();
        let (_, tx, mut rx) = ctx.socket();
        let mut socket = ClientSocket::new(tx);
        for attempt in 0..50 {
            display_join(&ctx.state, &mut socket, Some(format!("bogus-{attempt}"))).await;
        }
        display_join(&ctx.state, &mut socket, Some("../escaped".into())).await;
        admin_join(&ctx.state, &mut socket, Some("bogus".into()), Some("secret".into())).await;

        assert_eq!(ctx.state.hubs().len(), before);
        assert!(socket.identity().is_none());
        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 52);
        assert!(frames
            .iter()
            .all(|(name, data)| name == "error" && data["message"] == UNKNOWN_SESSION));
    }

    #[tokio::test]
    async fn rejoining_unchanged_player_keeps_revision() {
        let (ctx, player_id) = quiz_with_player().await;
        let revision = || async {
            ctx.state
                .registry()
                .get("GLOBAL")
                .unwrap()
                .session()
                .read()
                .await
                .revision
        };
        let before = revision().await;

        let (_first, _first_rx) = joined(&ctx, &player_id).await;
        let (_second, mut second_rx) = joined(&ctx, &player_id).await;

        assert_eq!(revision().await, before);
        assert_eq!(names(&drain(&mut second_rx))[0], "joined");
    }
}
