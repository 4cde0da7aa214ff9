use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, timeout_at},
};
use tracing::{debug, info, warn};

use crate::{
    dto::{events::QuizEvent, ws::ClientMessage},
    services::socket_service::{self, ClientSocket},
    state::SharedState,
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle of one player, display or admin WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let mut client = ClientSocket::new(outbound_tx.clone());
    let deadline = Instant::now() + IDENT_TIMEOUT;
    debug!(connection = %client.id(), "websocket connected");

    loop {
        let next = if client.identity().is_some() {
            receiver.next().await
        } else {
            match timeout_at(deadline, receiver.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(connection = %client.id(), "websocket identification timed out");
                    let _ = outbound_tx.send(Message::Close(None));
                    break;
                }
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(message) => socket_service::handle_message(&state, &mut client, message).await,
                    Err(err) => {
                        debug!(connection = %client.id(), error = %err, "failed to parse client message");
                        client.reply(&QuizEvent::error("Malformed message"));
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                warn!(connection = %client.id(), error = %err, "websocket receive error");
                break;
            }
        }
    }

    client.leave(&state);
    info!(connection = %client.id(), "websocket disconnected");
    drop(client);
    finalize(writer_task, outbound_tx).await;
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
