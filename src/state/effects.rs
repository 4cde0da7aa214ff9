use uuid::Uuid;

use crate::{
    dto::events::{LeaderboardEntry, QuizEvent},
    state::quiz::PlayerId,
};

/// Who receives an emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every player and display connected to the session.
    Players,
    /// Every admin connected to the session.
    Admins,
    /// The active connection of one player, if any.
    Player(PlayerId),
    /// One specific connection.
    Connection(Uuid),
}

/// Event addressed to an audience.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub audience: Audience,
    pub event: QuizEvent,
}

/// Side effects produced by a session mutation, applied once the mutation is committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    /// Notifications in emission order.
    pub events: Vec<Outbound>,
    /// Ranked leaderboard to archive after a settlement.
    pub audit_snapshot: Option<Vec<LeaderboardEntry>>,
}

impl Effects {
    pub fn emit(&mut self, audience: Audience, event: QuizEvent) {
        self.events.push(Outbound { audience, event });
    }

    /// Emit the same event to admins, then players.
    pub fn emit_everyone(&mut self, event: QuizEvent) {
        self.emit(Audience::Admins, event.clone());
        self.emit(Audience::Players, event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.audit_snapshot.is_none()
    }

    /// Events sent to `audience`, in order. Handy in tests.
    pub fn events_for(&self, audience: &Audience) -> Vec<&QuizEvent> {
        self.events
            .iter()
            .filter(|outbound| &outbound.audience == audience)
            .map(|outbound| &outbound.event)
            .collect()
    }

    /// Event names in emission order, regardless of audience.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(|outbound| outbound.event.name()).collect()
    }
}
