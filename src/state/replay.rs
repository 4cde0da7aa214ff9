//! Catch-up events for connections joining mid-round.

use crate::{
    dto::events::{AnswerLockedEvent, AnswerResultEvent, QuizEvent, RevealEvent},
    state::{quiz::QuizSession, timing::Timestamp},
};

impl QuizSession {
    /// Events a continuously connected player would have seen for the current question.
    ///
    /// Pure projection: nothing is mutated.
    pub fn replay_for_player(&self, player_id: &str, now: Timestamp, max_points: u32) -> Vec<QuizEvent> {
        let mut events = Vec::new();
        if let Some(player) = self.players.get(player_id) {
            events.push(QuizEvent::LifelineStatus(player.lifelines.clone()));
        }
        if !self.is_active {
            return events;
        }
        let Some(question_event) = self.question_event(now) else {
            return events;
        };
        events.push(QuizEvent::Question(question_event));
        events.push(QuizEvent::Status(self.status_event(now)));

        let locked = self.ledger.get(player_id);
        if let Some(answer) = locked {
            events.push(QuizEvent::AnswerLocked(AnswerLockedEvent {
                locked: true,
                answer: answer.value.clone(),
            }));
        }

        if self.revealed {
            let correct_answer = self
                .current_question()
                .and_then(|(_, question)| question.answer.clone());
            events.push(QuizEvent::Reveal(RevealEvent { correct_answer }));

            let outcome = self
                .evaluate_answers(max_points)
                .and_then(|settlement| settlement.outcomes.get(player_id).copied());
            if let (Some(outcome), Some(player)) = (outcome, self.players.get(player_id)) {
                events.push(QuizEvent::AnswerResult(AnswerResultEvent {
                    correct: outcome.correct,
                    score: player.score,
                    rank: outcome.rank,
                    awarded: outcome.awarded,
                }));
            }
        }
        events
    }

    /// Events a display screen needs to render the current question.
    pub fn replay_for_display(&self, now: Timestamp) -> Vec<QuizEvent> {
        let mut events = Vec::new();
        if !self.is_active {
            return events;
        }
        if let Some(question_event) = self.question_event(now) {
            events.push(QuizEvent::Question(question_event));
            events.push(QuizEvent::Status(self.status_event(now)));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::quiz::{Player, Question};

    fn running_session() -> QuizSession {
        let mut session = QuizSession::new("GLOBAL");
        session.replace_questions(vec![Question {
            id: "q1".into(),
            text: "Say a".into(),
            choices: None,
            answer: Some("a".into()),
            duration: 10,
            hint: None,
        }]);
        for (id, name) in [("p1", "Ada"), ("p2", "Bob"), ("p3", "Cy")] {
            session
                .players
                .insert(id.into(), Player::new(id.into(), name.into(), None, id.into()));
        }
        session.start(None, 0.0).unwrap();
        session
    }

    fn names(events: &[QuizEvent]) -> Vec<&'static str> {
        events.iter().map(QuizEvent::name).collect()
    }

    #[test]
    fn idle_session_only_replays_lifelines() {
        let mut session = QuizSession::new("GLOBAL");
        session
            .players
            .insert("p1".into(), Player::new("p1".into(), "Ada".into(), None, "p1".into()));
        assert_eq!(names(&session.replay_for_player("p1", 0.0, 1000)), ["lifeline_status"]);
    }

    #[test]
    fn locked_answer_is_replayed_with_remaining_time() {
        let mut session = running_session();
        session.submit_answer("p1", "A".into(), 3.0).unwrap();

        let events = session.replay_for_player("p1", 4.0, 1000);
        assert_eq!(
            names(&events),
            ["lifeline_status", "question", "status", "answer_locked"]
        );
        match &events[1] {
            QuizEvent::Question(question) => assert_eq!(question.remaining, 6.0),
            other => panic!("unexpected event: {other:?}"),
        }
        match &events[3] {
            QuizEvent::AnswerLocked(locked) => assert_eq!(locked.answer, "A"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn revealed_question_replays_personal_result_without_mutation() {
        let mut session = running_session();
        session.submit_answer("p2", "a".into(), 1.0).unwrap();
        session.submit_answer("p1", "a".into(), 4.0).unwrap();
        session.submit_answer("p3", "b".into(), 5.0).unwrap();
        session.reveal(6.0, 1000);
        let scores_before: Vec<i64> = session.players.values().map(|p| p.score).collect();

        let events = session.replay_for_player("p1", 9.0, 1000);
        assert_eq!(
            names(&events),
            ["lifeline_status", "question", "status", "answer_locked", "reveal", "answer_result"]
        );
        match events.last() {
            Some(QuizEvent::AnswerResult(result)) => {
                assert!(result.correct);
                assert_eq!(result.rank, Some(2));
                assert_eq!(result.awarded, 600);
                assert_eq!(result.score, 600);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let wrong = session.replay_for_player("p3", 9.0, 1000);
        match wrong.last() {
            Some(QuizEvent::AnswerResult(result)) => {
                assert!(!result.correct);
                assert_eq!(result.rank, None);
                assert_eq!(result.awarded, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let scores_after: Vec<i64> = session.players.values().map(|p| p.score).collect();
        assert_eq!(scores_before, scores_after);
        assert_eq!(session.players["p2"].correct_firsts, 1);
    }

    #[test]
    fn player_without_answer_gets_no_result_after_reveal() {
        let mut session = running_session();
        session.reveal(2.0, 1000);
        let events = session.replay_for_player("p1", 3.0, 1000);
        assert_eq!(names(&events), ["lifeline_status", "question", "status", "reveal"]);
    }

    #[test]
    fn display_sees_question_and_status() {
        let session = running_session();
        assert_eq!(names(&session.replay_for_display(1.0)), ["question", "status"]);
    }
}
