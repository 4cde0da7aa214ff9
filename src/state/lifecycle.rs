//! Question lifecycle transitions and the notifications they produce.

use thiserror::Error;

use crate::{
    dto::events::{
        AnswerResultEvent, FinalResultsEvent, QuizEvent, RevealEvent, SessionRef,
    },
    state::{
        effects::{Audience, Effects},
        quiz::QuizSession,
        state_machine::{InvalidTransition, LifecycleEvent},
        timing::Timestamp,
    },
};

/// Errors raised by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("no questions loaded")]
    NoQuestions,
    #[error("question index {index} out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// What a call to [`QuizSession::next`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// The current question was settled instead of advancing.
    Revealed,
    /// A new question is on screen.
    Advanced(usize),
    /// The cursor moved past the last question.
    Completed,
}

impl QuizSession {
    /// Start a round at `index` (default 0), restoring every player's lifelines.
    pub fn start(&mut self, index: Option<usize>, now: Timestamp) -> Result<Effects, LifecycleError> {
        if self.questions.is_empty() {
            return Err(LifecycleError::NoQuestions);
        }
        let index = index.unwrap_or(0);
        self.ensure_in_range(index)?;
        self.check_transition(LifecycleEvent::Start)?;

        let mut effects = Effects::default();
        self.begin_question(index, now);
        self.restore_lifelines();
        for player in self.players.values() {
            effects.emit(
                Audience::Player(player.id.clone()),
                QuizEvent::LifelineStatus(player.lifelines.clone()),
            );
        }
        self.announce_current_question(now, &mut effects);
        effects.emit(Audience::Admins, QuizEvent::AnswersProgress(self.answers_progress()));
        Ok(effects)
    }

    /// Jump to `index`, re-activating the session.
    pub fn goto(&mut self, index: usize, now: Timestamp) -> Result<Effects, LifecycleError> {
        self.ensure_in_range(index)?;
        self.check_transition(LifecycleEvent::Goto)?;

        let mut effects = Effects::default();
        effects.emit(Audience::Players, QuizEvent::LeaderboardHide {});
        self.begin_question(index, now);
        self.announce_current_question(now, &mut effects);
        effects.emit(Audience::Admins, QuizEvent::AnswersProgress(self.answers_progress()));
        Ok(effects)
    }

    /// Reveal the current question if unrevealed, otherwise move to the next one.
    pub fn next(
        &mut self,
        now: Timestamp,
        max_points: u32,
    ) -> Result<(NextOutcome, Effects), LifecycleError> {
        if self.questions.is_empty() {
            return Err(LifecycleError::NoQuestions);
        }
        if self.check_transition(LifecycleEvent::Reveal).is_ok() {
            return Ok((NextOutcome::Revealed, self.reveal(now, max_points)));
        }

        let len = self.questions.len();
        let target = match self.current_index {
            None => 0,
            Some(index) => (index + 1).min(len),
        };
        self.check_transition(LifecycleEvent::Advance {
            has_next: target < len,
        })?;

        let mut effects = Effects::default();
        if self.current_index == Some(len) {
            return Ok((NextOutcome::Completed, effects));
        }

        effects.emit(Audience::Players, QuizEvent::LeaderboardHide {});
        if target < len {
            self.begin_question(target, now);
            self.announce_current_question(now, &mut effects);
            effects.emit(Audience::Admins, QuizEvent::AnswersProgress(self.answers_progress()));
            Ok((NextOutcome::Advanced(target), effects))
        } else {
            self.current_index = Some(len);
            self.revealed = false;
            self.ledger.clear();
            self.clock.clear();
            self.announce_current_question(now, &mut effects);
            Ok((NextOutcome::Completed, effects))
        }
    }

    /// Settle the current question. A no-op unless answers are still being collected.
    pub fn reveal(&mut self, now: Timestamp, max_points: u32) -> Effects {
        let mut effects = Effects::default();
        if self.check_transition(LifecycleEvent::Reveal).is_err() {
            return effects;
        }
        let Some(settlement) = self.evaluate_answers(max_points) else {
            return effects;
        };
        let correct_answer = self
            .current_question()
            .and_then(|(_, question)| question.answer.clone());

        self.apply_settlement(&settlement);
        self.revealed = true;

        effects.emit(Audience::Players, QuizEvent::Reveal(RevealEvent { correct_answer }));
        for (player_id, outcome) in &settlement.outcomes {
            let score = self
                .players
                .get(player_id)
                .map(|player| player.score)
                .unwrap_or_default();
            effects.emit(
                Audience::Player(player_id.clone()),
                QuizEvent::AnswerResult(AnswerResultEvent {
                    correct: outcome.correct,
                    score,
                    rank: outcome.rank,
                    awarded: outcome.awarded,
                }),
            );
        }
        let leaderboard = self.leaderboard();
        effects.emit_everyone(QuizEvent::Leaderboard(leaderboard.clone()));
        effects.emit_everyone(QuizEvent::Status(self.status_event(now)));
        effects.audit_snapshot = Some(leaderboard);
        effects
    }

    /// Flip the pause flag, returning whether the question is now paused.
    pub fn toggle_pause(&mut self, now: Timestamp) -> (bool, Effects) {
        let paused = self.clock.toggle_pause(now);
        let code = SessionRef {
            code: self.id.clone(),
        };
        let mut effects = Effects::default();
        let event = if paused {
            QuizEvent::Paused(code)
        } else {
            QuizEvent::Resumed(code)
        };
        effects.emit(Audience::Players, event);
        (paused, effects)
    }

    /// Drop the questions and every per-question state. Players and scores are kept.
    pub fn reset(&mut self) -> Result<Effects, LifecycleError> {
        self.check_transition(LifecycleEvent::Reset)?;
        self.questions.clear();
        self.current_index = None;
        self.is_active = false;
        self.revealed = false;
        self.clock.clear();
        self.ledger.clear();
        self.sudden_death.clear();

        let mut effects = Effects::default();
        effects.emit(Audience::Players, QuizEvent::LeaderboardHide {});
        effects.emit(
            Audience::Players,
            QuizEvent::Reset(SessionRef {
                code: self.id.clone(),
            }),
        );
        Ok(effects)
    }

    /// `final_results` payload, ranked with tie-break statistics.
    pub fn final_results(&self) -> FinalResultsEvent {
        FinalResultsEvent {
            leaderboard: self.leaderboard(),
        }
    }

    fn ensure_in_range(&self, index: usize) -> Result<(), LifecycleError> {
        let len = self.questions.len();
        if index >= len {
            return Err(LifecycleError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    fn begin_question(&mut self, index: usize, now: Timestamp) {
        self.current_index = Some(index);
        self.is_active = true;
        self.revealed = false;
        self.ledger.clear();
        self.clock.start(now);
    }

    /// Push the question on screen, or wrap up the quiz when the cursor is past the end.
    fn announce_current_question(&mut self, now: Timestamp, effects: &mut Effects) {
        if let Some(question) = self.question_event(now) {
            effects.emit_everyone(QuizEvent::Question(question));
            effects.emit_everyone(QuizEvent::Status(self.status_event(now)));
            return;
        }
        if self.is_active {
            effects.emit(Audience::Players, QuizEvent::Complete {});
        }
        self.is_active = false;
        effects.emit(Audience::Admins, QuizEvent::FinalResults(self.final_results()));
        self.sudden_death.clear();
    }
}
