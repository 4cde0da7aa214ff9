use tracing::{debug, warn};

use crate::{
    dto::events::{QuizEvent, ServerEvent},
    state::{
        AppState,
        effects::{Audience, Outbound},
        hub::SessionHub,
    },
};

/// Deliver engine notifications of `session_id` in emission order.
///
/// Delivery is best-effort: events for offline players or closed sockets are dropped.
pub fn dispatch_effects(state: &AppState, session_id: &str, events: &[Outbound]) {
    if events.is_empty() {
        return;
    }
    // No hub means nobody ever subscribed to this session.
    let Some(hub) = state.hubs().existing(session_id) else {
        return;
    };
    for outbound in events {
        deliver(&hub, session_id, &outbound.audience, &outbound.event);
    }
}

/// Deliver one event outside of a session operation.
pub fn dispatch_event(state: &AppState, session_id: &str, audience: Audience, event: QuizEvent) {
    if let Some(hub) = state.hubs().existing(session_id) {
        deliver(&hub, session_id, &audience, &event);
    }
}

fn deliver(hub: &SessionHub, session_id: &str, audience: &Audience, event: &QuizEvent) {
    let frame = match ServerEvent::from_quiz_event(event) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(session = %session_id, event = event.name(), error = %err, "failed to serialize event");
            return;
        }
    };

    match audience {
        Audience::Players => hub.publish_players(&frame),
        Audience::Admins => hub.publish_admins(&frame),
        Audience::Player(player_id) => {
            if !hub.send_to_player(player_id, &frame) {
                debug!(
                    session = %session_id,
                    player_id = %player_id,
                    event = event.name(),
                    "player offline; event dropped"
                );
            }
        }
        Audience::Connection(connection_id) => {
            if !hub.send_to_connection(*connection_id, &frame) {
                debug!(
                    session = %session_id,
                    connection = %connection_id,
                    event = event.name(),
                    "connection gone; event dropped"
                );
            }
        }
    }
}
