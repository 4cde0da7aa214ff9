//! Per-question record of locked answers.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::{
    quiz::{PlayerId, QuizSession},
    timing::Timestamp,
};

/// Why a submission was refused. Sent back to the player verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("the question is paused or already revealed")]
    PausedOrRevealed,
    #[error("no question is currently active")]
    NoActiveQuestion,
    #[error("only sudden-death players may answer")]
    SuddenDeathNotAllowed,
    #[error("the answer window has closed")]
    TimeExpired,
    #[error("an answer is already locked for this question")]
    AlreadyLocked,
}

/// A player's answer together with the server receipt time.
#[derive(Debug, Clone, PartialEq)]
pub struct LockedAnswer {
    /// Value exactly as submitted.
    pub value: String,
    pub received_at: Timestamp,
}

/// Answers locked for the current question, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct AnswerLedger {
    entries: IndexMap<PlayerId, LockedAnswer>,
}

impl AnswerLedger {
    /// Record the first answer of `player_id`. Later attempts are refused untouched.
    pub fn lock(
        &mut self,
        player_id: PlayerId,
        value: String,
        received_at: Timestamp,
    ) -> Result<&LockedAnswer, RejectReason> {
        match self.entries.entry(player_id) {
            indexmap::map::Entry::Occupied(_) => Err(RejectReason::AlreadyLocked),
            indexmap::map::Entry::Vacant(slot) => Ok(slot.insert(LockedAnswer {
                value,
                received_at,
            })),
        }
    }

    pub(crate) fn restore(&mut self, player_id: PlayerId, answer: LockedAnswer) {
        self.entries.insert(player_id, answer);
    }

    pub fn get(&self, player_id: &str) -> Option<&LockedAnswer> {
        self.entries.get(player_id)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.entries.contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &LockedAnswer)> {
        self.entries.iter()
    }

    /// Drop every entry; called on each question transition.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl QuizSession {
    /// Lock `value` as `player_id`'s answer for the current question.
    pub fn submit_answer(
        &mut self,
        player_id: &str,
        value: String,
        now: Timestamp,
    ) -> Result<&LockedAnswer, RejectReason> {
        if self.paused() || self.revealed {
            return Err(RejectReason::PausedOrRevealed);
        }
        let Some((_, question)) = self.current_question() else {
            return Err(RejectReason::NoActiveQuestion);
        };
        if !self.sudden_death.permits(player_id) {
            return Err(RejectReason::SuddenDeathNotAllowed);
        }
        if self.clock.elapsed(now) > f64::from(question.duration) {
            return Err(RejectReason::TimeExpired);
        }
        self.ledger.lock(player_id.to_string(), value, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::quiz::{Player, Question};

    fn session_with_question(duration: u32) -> QuizSession {
        let mut session = QuizSession::new("GLOBAL");
        session.replace_questions(vec![Question {
            id: "q1".into(),
            text: "2 + 2?".into(),
            choices: None,
            answer: Some("4".into()),
            duration,
            hint: None,
        }]);
        for id in ["p1", "p2"] {
            session.players.insert(
                id.into(),
                Player::new(id.into(), id.to_uppercase(), None, format!("{id}@x")),
            );
        }
        session.current_index = Some(0);
        session.is_active = true;
        session.clock.start(100.0);
        session
    }

    #[test]
    fn second_submission_is_already_locked_and_keeps_first() {
        let mut session = session_with_question(30);
        session
            .submit_answer("p1", "4".into(), 101.0)
            .expect("first submission accepted");
        let err = session
            .submit_answer("p1", "5".into(), 102.0)
            .expect_err("second submission rejected");
        assert_eq!(err, RejectReason::AlreadyLocked);
        let locked = session.ledger.get("p1").expect("entry kept");
        assert_eq!(locked.value, "4");
        assert_eq!(locked.received_at, 101.0);
    }

    #[test]
    fn paused_or_revealed_is_checked_first() {
        let mut session = session_with_question(30);
        session.clock.toggle_pause(101.0);
        assert_eq!(
            session.submit_answer("p1", "4".into(), 102.0).unwrap_err(),
            RejectReason::PausedOrRevealed
        );

        let mut session = session_with_question(30);
        session.revealed = true;
        assert_eq!(
            session.submit_answer("p1", "4".into(), 102.0).unwrap_err(),
            RejectReason::PausedOrRevealed
        );
    }

    #[test]
    fn no_active_question_outside_range() {
        let mut session = session_with_question(30);
        session.current_index = None;
        assert_eq!(
            session.submit_answer("p1", "4".into(), 101.0).unwrap_err(),
            RejectReason::NoActiveQuestion
        );
        session.current_index = Some(1);
        assert_eq!(
            session.submit_answer("p1", "4".into(), 101.0).unwrap_err(),
            RejectReason::NoActiveQuestion
        );
    }

    #[test]
    fn boundary_submission_is_accepted_and_later_one_expires() {
        let mut session = session_with_question(10);
        assert!(session.submit_answer("p1", "4".into(), 110.0).is_ok());
        assert_eq!(
            session.submit_answer("p2", "4".into(), 110.5).unwrap_err(),
            RejectReason::TimeExpired
        );
    }

    #[test]
    fn sudden_death_gates_non_allowed_players() {
        let mut session = session_with_question(30);
        session.start_sudden_death(Some(vec!["p1".into()]), None);
        assert_eq!(
            session.submit_answer("p2", "4".into(), 101.0).unwrap_err(),
            RejectReason::SuddenDeathNotAllowed
        );
        assert!(session.submit_answer("p1", "4".into(), 101.0).is_ok());
    }

    #[test]
    fn reasons_serialize_as_snake_case() {
        let json = serde_json::to_string(&RejectReason::SuddenDeathNotAllowed).unwrap();
        assert_eq!(json, "\"sudden_death_not_allowed\"");
    }
}
