//! Settlement of locked answers into points and tie-break statistics.

use indexmap::IndexMap;

use crate::state::quiz::{PlayerId, QuizSession};

/// Result of one locked answer once the question is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// 1-based position among correct respondents by receipt time.
    pub rank: Option<usize>,
    pub awarded: i64,
}

/// Outcome of every locked answer of the current question, in lock order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settlement {
    pub outcomes: IndexMap<PlayerId, AnswerOutcome>,
    /// Clamped elapsed seconds credited to each correct respondent.
    pub credited_time: IndexMap<PlayerId, f64>,
    /// Earliest correct respondent, credited with a first.
    pub first: Option<PlayerId>,
}

/// Points for a correct answer after `clamped_elapsed` seconds of a `duration`-second question.
///
/// Halfway values round to the nearest even integer.
pub fn awarded_points(max_points: u32, duration: u32, clamped_elapsed: f64) -> i64 {
    if duration == 0 {
        return 0;
    }
    let duration = f64::from(duration);
    let remaining = (duration - clamped_elapsed).max(0.0);
    (f64::from(max_points) * remaining / duration).round_ties_even() as i64
}

impl QuizSession {
    /// Score the current ledger without touching any state.
    ///
    /// Returns `None` when no question is on screen.
    pub fn evaluate_answers(&self, max_points: u32) -> Option<Settlement> {
        let (_, question) = self.current_question()?;

        let mut correct: Vec<(&PlayerId, f64)> = self
            .ledger
            .iter()
            .filter(|(player_id, answer)| {
                self.players.contains_key(*player_id) && question.accepts(&answer.value)
            })
            .map(|(player_id, answer)| (player_id, answer.received_at))
            .collect();
        // Stable: equal receipt times keep lock order.
        correct.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut settlement = Settlement {
            first: correct.first().map(|(player_id, _)| (*player_id).clone()),
            ..Settlement::default()
        };

        for (player_id, answer) in self.ledger.iter() {
            if !self.players.contains_key(player_id) {
                continue;
            }
            let rank = correct
                .iter()
                .position(|(candidate, _)| *candidate == player_id)
                .map(|position| position + 1);
            let outcome = match rank {
                Some(_) => {
                    let clamped = self.clock.answer_elapsed(answer.received_at, question.duration);
                    settlement.credited_time.insert(player_id.clone(), clamped);
                    AnswerOutcome {
                        correct: true,
                        rank,
                        awarded: awarded_points(max_points, question.duration, clamped),
                    }
                }
                None => AnswerOutcome {
                    correct: false,
                    rank: None,
                    awarded: 0,
                },
            };
            settlement.outcomes.insert(player_id.clone(), outcome);
        }

        Some(settlement)
    }

    /// Credit a settlement to the roster. Only called once per question by the reveal transition.
    pub(crate) fn apply_settlement(&mut self, settlement: &Settlement) {
        if let Some(player) = settlement
            .first
            .as_ref()
            .and_then(|player_id| self.players.get_mut(player_id))
        {
            player.correct_firsts += 1;
        }
        for (player_id, outcome) in &settlement.outcomes {
            if !outcome.correct {
                continue;
            }
            if let Some(player) = self.players.get_mut(player_id) {
                player.score += outcome.awarded;
                player.cumulative_answer_time +=
                    settlement.credited_time.get(player_id).copied().unwrap_or(0.0);
            }
        }
    }
}
