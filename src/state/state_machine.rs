use thiserror::Error;

use crate::state::quiz::QuizSession;

/// Phases a question round can be in.
///
/// Pausing is orthogonal and tracked by the question clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPhase {
    /// No question has been shown yet.
    Idle,
    /// A question is on screen and answers are being locked.
    AwaitingAnswers,
    /// The current question has been settled and its answer disclosed.
    Revealed,
    /// Every question has been played.
    Complete,
}

/// Lifecycle events driving [`QuestionPhase`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Begin a round at a given question, restoring lifelines.
    Start,
    /// Jump to an arbitrary question.
    Goto,
    /// Settle the current question.
    Reveal,
    /// Move past the current question.
    Advance {
        /// Whether a question exists after the cursor.
        has_next: bool,
    },
    /// Drop the questions and return to idle.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the session was in when the event was received.
    pub from: QuestionPhase,
    /// The event that cannot be applied from this phase.
    pub event: LifecycleEvent,
}

/// Compute the phase reached by applying `event` in `from`.
pub fn compute_transition(
    from: QuestionPhase,
    event: LifecycleEvent,
) -> Result<QuestionPhase, InvalidTransition> {
    let next = match (from, event) {
        (_, LifecycleEvent::Start) | (_, LifecycleEvent::Goto) => QuestionPhase::AwaitingAnswers,
        (QuestionPhase::AwaitingAnswers, LifecycleEvent::Reveal) => QuestionPhase::Revealed,
        (
            QuestionPhase::Idle | QuestionPhase::Revealed,
            LifecycleEvent::Advance { has_next: true },
        ) => QuestionPhase::AwaitingAnswers,
        (
            QuestionPhase::Idle | QuestionPhase::Revealed | QuestionPhase::Complete,
            LifecycleEvent::Advance { .. },
        ) => QuestionPhase::Complete,
        (_, LifecycleEvent::Reset) => QuestionPhase::Idle,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

impl QuizSession {
    /// Phase derived from the cursor and reveal flag.
    pub fn phase(&self) -> QuestionPhase {
        match self.current_index {
            None => QuestionPhase::Idle,
            Some(index) if index >= self.questions.len() => QuestionPhase::Complete,
            Some(_) if self.revealed => QuestionPhase::Revealed,
            Some(_) => QuestionPhase::AwaitingAnswers,
        }
    }

    /// Validate `event` against the current phase.
    pub fn check_transition(&self, event: LifecycleEvent) -> Result<QuestionPhase, InvalidTransition> {
        compute_transition(self.phase(), event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(phase: QuestionPhase, event: LifecycleEvent) -> QuestionPhase {
        compute_transition(phase, event).unwrap()
    }

    #[test]
    fn full_happy_path_through_quiz() {
        let mut phase = QuestionPhase::Idle;
        phase = apply(phase, LifecycleEvent::Start);
        assert_eq!(phase, QuestionPhase::AwaitingAnswers);
        phase = apply(phase, LifecycleEvent::Reveal);
        assert_eq!(phase, QuestionPhase::Revealed);
        phase = apply(phase, LifecycleEvent::Advance { has_next: true });
        assert_eq!(phase, QuestionPhase::AwaitingAnswers);
        phase = apply(phase, LifecycleEvent::Reveal);
        phase = apply(phase, LifecycleEvent::Advance { has_next: false });
        assert_eq!(phase, QuestionPhase::Complete);
        assert_eq!(apply(phase, LifecycleEvent::Reset), QuestionPhase::Idle);
    }

    #[test]
    fn reveal_is_only_valid_while_awaiting_answers() {
        for from in [
            QuestionPhase::Idle,
            QuestionPhase::Revealed,
            QuestionPhase::Complete,
        ] {
            let err = compute_transition(from, LifecycleEvent::Reveal).unwrap_err();
            assert_eq!(err.from, from);
            assert_eq!(err.event, LifecycleEvent::Reveal);
        }
    }

    #[test]
    fn advancing_unrevealed_question_is_rejected() {
        match compute_transition(
            QuestionPhase::AwaitingAnswers,
            LifecycleEvent::Advance { has_next: true },
        ) {
            Err(InvalidTransition { from, .. }) => assert_eq!(from, QuestionPhase::AwaitingAnswers),
            other => panic!("unexpected transition: {other:?}"),
        }
    }

    #[test]
    fn complete_stays_complete_on_advance() {
        assert_eq!(
            apply(QuestionPhase::Complete, LifecycleEvent::Advance { has_next: false }),
            QuestionPhase::Complete
        );
    }

    #[test]
    fn phase_follows_session_cursor() {
        let mut session = QuizSession::new("GLOBAL");
        assert_eq!(session.phase(), QuestionPhase::Idle);
        session.current_index = Some(0);
        assert_eq!(session.phase(), QuestionPhase::Complete);
    }
}
