//! Gate deciding whether a player may use a lifeline, and what it yields.

use rand::Rng;

use crate::state::quiz::{LifelineKind, QuizSession};

/// Chooses which wrong choice survives a 50/50.
pub trait ChoicePicker: Send + Sync {
    /// Return an index into `candidates`, which is never empty.
    fn pick(&self, candidates: &[&str]) -> usize;
}

/// Uniform choice backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPicker;

impl ChoicePicker for RandomPicker {
    fn pick(&self, candidates: &[&str]) -> usize {
        rand::rng().random_range(0..candidates.len())
    }
}

/// What a granted lifeline produces for the requesting player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifelineEffect {
    /// Choice ids left visible: the correct one, then at most one wrong one.
    FiftyFifty { keep_ids: Vec<String> },
    Hint { hint: String },
    /// Consumed without effect because the current question cannot support it.
    Acknowledged(LifelineKind),
}

/// Successful lifeline use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifelineGrant {
    pub kind: LifelineKind,
    pub player_name: String,
    pub effect: LifelineEffect,
}

impl QuizSession {
    /// Consume `requested` for `player_id` if allowed and compute its effect.
    ///
    /// Returns `None` when denied; nothing is consumed in that case.
    pub fn use_lifeline(
        &mut self,
        player_id: &str,
        requested: &str,
        picker: &dyn ChoicePicker,
    ) -> Option<LifelineGrant> {
        let kind = LifelineKind::parse(requested)?;
        if !self.lifelines_enabled.get(&kind).copied().unwrap_or(false) {
            return None;
        }
        let player = self.players.get_mut(player_id)?;
        let available = player.lifelines.entry(kind).or_insert(false);
        if !*available {
            return None;
        }
        *available = false;
        let player_name = player.name.clone();

        let question = self.current_question().map(|(_, question)| question);
        let effect = match (kind, question) {
            (LifelineKind::FiftyFifty, Some(question)) => {
                match (question.choices.as_deref(), question.answer.as_deref()) {
                    (Some(choices), Some(answer)) if !choices.is_empty() => {
                        let wrong: Vec<&str> = choices
                            .iter()
                            .map(|choice| choice.id.as_str())
                            .filter(|id| *id != answer)
                            .collect();
                        let mut keep_ids = vec![answer.to_string()];
                        if !wrong.is_empty() {
                            let index = picker.pick(&wrong).min(wrong.len() - 1);
                            keep_ids.push(wrong[index].to_string());
                        }
                        LifelineEffect::FiftyFifty { keep_ids }
                    }
                    _ => LifelineEffect::Acknowledged(kind),
                }
            }
            (LifelineKind::Hint, Some(question)) => LifelineEffect::Hint {
                hint: question.hint.clone().unwrap_or_default(),
            },
            (kind, None) => LifelineEffect::Acknowledged(kind),
        };

        Some(LifelineGrant {
            kind,
            player_name,
            effect,
        })
    }

    /// Restore every lifeline for every player, done when a round starts.
    pub(crate) fn restore_lifelines(&mut self) {
        for player in self.players.values_mut() {
            player.lifelines = LifelineKind::full_map(true);
        }
    }

    /// Apply a quiz-wide lifeline switch. Unknown names are ignored.
    pub fn set_lifelines_enabled<'a>(&mut self, switches: impl IntoIterator<Item = (&'a str, bool)>) {
        for (name, enabled) in switches {
            if let Some(kind) = LifelineKind::parse(name) {
                self.lifelines_enabled.insert(kind, enabled);
            }
        }
    }
}
