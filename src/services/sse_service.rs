use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::events::ServerEvent,
    error::ServiceError,
    state::SharedState,
};

/// Which room of a session an SSE stream mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Public,
    Admin,
}

/// Subscribe to the player room of a session.
pub fn subscribe_public(
    state: &SharedState,
    code: &str,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    state.session(code)?;
    Ok(state.hubs().session(code).players().subscribe())
}

/// Subscribe to the admin room of a session once the token checks out.
pub fn subscribe_admin(
    state: &SharedState,
    code: &str,
    token: Option<&str>,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    if !token.is_some_and(|token| state.is_admin_token(token)) {
        return Err(ServiceError::Unauthorized("invalid admin token".into()));
    }
    state.session(code)?;
    Ok(state.hubs().session(code).admins().subscribe())
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the
/// client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    code: String,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(session = %code, ?kind, skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }
        info!(session = %code, ?kind, "SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::events::QuizEvent,
        services::{dispatch::dispatch_event, test_support::TestContext},
        state::effects::Audience,
    };

    #[tokio::test]
    async fn admin_stream_requires_token() {
        let ctx = TestContext::with_default_session().await;
        assert!(matches!(
            subscribe_admin(&ctx.state, "GLOBAL", None),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            subscribe_admin(&ctx.state, "GLOBAL", Some("nope")),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(subscribe_admin(&ctx.state, "GLOBAL", Some("secret")).is_ok());
    }

    #[tokio::test]
    async fn public_stream_sees_player_broadcasts() {
        let ctx = TestContext::with_default_session().await;
        assert!(matches!(
            subscribe_public(&ctx.state, "missing"),
            Err(ServiceError::NotFound(_))
        ));

        let mut receiver = subscribe_public(&ctx.state, "GLOBAL").unwrap();
        dispatch_event(&ctx.state, "GLOBAL", Audience::Players, QuizEvent::LeaderboardHide {});
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("leaderboard_hide"));
    }
}
