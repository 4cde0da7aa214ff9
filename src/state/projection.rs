//! Read-only views of a session, shared by live notifications, replays and HTTP.

use crate::{
    dto::events::{
        AnswersProgressEvent, ChoiceView, PlayerRef, QuestionEvent, QuestionView, StatusEvent,
    },
    state::{
        quiz::{Question, QuizSession},
        timing::Timestamp,
    },
};

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            text: question.text.clone(),
            choices: question.choices.as_ref().map(|choices| {
                choices
                    .iter()
                    .map(|choice| ChoiceView {
                        id: choice.id.clone(),
                        text: choice.text.clone(),
                    })
                    .collect()
            }),
            answer: None,
            duration: question.duration,
        }
    }
}

impl QuizSession {
    /// `question` payload for the question on screen.
    pub fn question_event(&self, now: Timestamp) -> Option<QuestionEvent> {
        let (index, question) = self.current_question()?;
        Some(QuestionEvent {
            question: question.into(),
            index,
            duration: question.duration,
            started_at: self.clock.started_at(),
            server_time: now,
            remaining: self.clock.remaining(now, question.duration),
        })
    }

    /// `status` payload; timing fields are empty when no question is on screen.
    pub fn status_event(&self, now: Timestamp) -> StatusEvent {
        let index = self
            .current_index
            .and_then(|index| i64::try_from(index).ok())
            .unwrap_or(-1);
        let current = self.current_question().map(|(_, question)| question);
        StatusEvent {
            index,
            total: self.questions.len(),
            paused: self.paused(),
            revealed: self.revealed,
            duration: current.map(|question| question.duration),
            started_at: current.and(self.clock.started_at()),
            server_time: now,
            remaining: self.remaining(now),
        }
    }

    /// Locked versus pending players for the current question.
    pub fn answers_progress(&self) -> AnswersProgressEvent {
        let player_ref = |id: &String| PlayerRef {
            id: id.clone(),
            name: self
                .players
                .get(id)
                .map(|player| player.name.clone())
                .unwrap_or_default(),
        };
        let locked: Vec<PlayerRef> = self.ledger.iter().map(|(id, _)| player_ref(id)).collect();
        let players: Vec<PlayerRef> = self.players.keys().map(player_ref).collect();
        let unlocked: Vec<PlayerRef> = self
            .players
            .keys()
            .filter(|id| !self.ledger.contains(id))
            .map(player_ref)
            .collect();
        AnswersProgressEvent {
            locked_count: locked.len(),
            players_count: players.len(),
            locked,
            players,
            unlocked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::quiz::{Choice, Player};

    fn session() -> QuizSession {
        let mut session = QuizSession::new("GLOBAL");
        session.replace_questions(vec![Question {
            id: "q1".into(),
            text: "Pick".into(),
            choices: Some(vec![Choice {
                id: "a".into(),
                text: "Alpha".into(),
            }]),
            answer: Some("a".into()),
            duration: 20,
            hint: Some("first letter".into()),
        }]);
        for (id, name) in [("p1", "Ada"), ("p2", "Bob")] {
            session
                .players
                .insert(id.into(), Player::new(id.into(), name.into(), None, id.into()));
        }
        session
    }

    #[test]
    fn question_payload_withholds_answer() {
        let mut session = session();
        session.current_index = Some(0);
        session.clock.start(10.0);
        let event = session.question_event(15.0).expect("question on screen");
        assert_eq!(event.question.answer, None);
        assert_eq!(event.remaining, 15.0);
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["question"].get("hint").is_none());
        assert_eq!(json["startedAt"], 10.0);
    }

    #[test]
    fn status_before_start_reports_minus_one() {
        let session = session();
        let status = session.status_event(1.0);
        assert_eq!(status.index, -1);
        assert_eq!(status.total, 1);
        assert_eq!(status.duration, None);
        assert_eq!(status.remaining, 0.0);
    }

    #[test]
    fn progress_splits_locked_and_unlocked() {
        let mut session = session();
        session.ledger.lock("p2".into(), "a".into(), 1.0).unwrap();
        let progress = session.answers_progress();
        assert_eq!(progress.locked_count, 1);
        assert_eq!(progress.players_count, 2);
        assert_eq!(progress.locked[0].name, "Bob");
        assert_eq!(progress.unlocked.len(), 1);
        assert_eq!(progress.unlocked[0].id, "p1");
    }
}
