use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dao::models::{ChoiceEntity, PlayerEntity, QuestionEntity, SessionEntity},
    state::{
        ledger::{AnswerLedger, LockedAnswer},
        sudden_death::SuddenDeath,
        timing::{QuestionClock, Timestamp},
    },
};

/// Identifier handed out to a registered player.
pub type PlayerId = String;

/// Limited-use power-ups a player may invoke once per started round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum LifelineKind {
    /// Removes all but one wrong choice.
    #[serde(rename = "5050")]
    FiftyFifty,
    /// Discloses the question hint.
    #[serde(rename = "hint")]
    Hint,
}

impl LifelineKind {
    /// Every lifeline type known to the engine.
    pub const ALL: [LifelineKind; 2] = [LifelineKind::FiftyFifty, LifelineKind::Hint];

    /// Wire name of the lifeline.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifelineKind::FiftyFifty => "5050",
            LifelineKind::Hint => "hint",
        }
    }

    /// Parse a wire name, returning `None` for unknown lifelines.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Availability map with every lifeline set to `value`.
    pub fn full_map(value: bool) -> BTreeMap<LifelineKind, bool> {
        Self::ALL.into_iter().map(|kind| (kind, value)).collect()
    }
}

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

/// A question of the quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub text: String,
    /// Ordered choices; `None` for open-response questions.
    pub choices: Option<Vec<Choice>>,
    /// Expected choice id or free-text value. `None` accepts any answer.
    pub answer: Option<String>,
    /// Allowed answering time in seconds.
    pub duration: u32,
    pub hint: Option<String>,
}

impl Question {
    /// Case- and whitespace-insensitive comparison against the expected answer.
    pub fn accepts(&self, submitted: &str) -> bool {
        match &self.answer {
            None => true,
            Some(expected) => normalize_answer(submitted) == normalize_answer(expected),
        }
    }
}

fn normalize_answer(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Registered participant and their running statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub email: Option<String>,
    /// Stable reconnect key, normally the lower-cased email.
    pub participant_code: String,
    pub score: i64,
    /// `true` while the lifeline is still available.
    pub lifelines: BTreeMap<LifelineKind, bool>,
    /// Questions this player answered correctly before anyone else.
    pub correct_firsts: u32,
    /// Seconds spent on questions answered correctly.
    pub cumulative_answer_time: f64,
}

impl Player {
    /// Create a player with a fresh set of lifelines and no score.
    pub fn new(id: PlayerId, name: String, email: Option<String>, participant_code: String) -> Self {
        Self {
            id,
            name,
            email,
            participant_code,
            score: 0,
            lifelines: LifelineKind::full_map(true),
            correct_firsts: 0,
            cumulative_answer_time: 0.0,
        }
    }
}

/// Live state of a single quiz, the unit of serialization and persistence.
#[derive(Debug, Clone)]
pub struct QuizSession {
    /// Upper-cased session identifier.
    pub id: String,
    pub questions: Vec<Question>,
    /// `None` before the first question; `Some(questions.len())` once complete.
    pub current_index: Option<usize>,
    pub players: IndexMap<PlayerId, Player>,
    pub is_active: bool,
    pub revealed: bool,
    pub clock: QuestionClock,
    pub ledger: AnswerLedger,
    pub lifelines_enabled: BTreeMap<LifelineKind, bool>,
    /// Lower-cased emails allowed to register; empty means open registration.
    pub allowed_emails: Vec<String>,
    pub sudden_death: SuddenDeath,
    /// Bumped on every mutation so stale snapshots are never written over newer ones.
    pub revision: u64,
}

impl QuizSession {
    /// Build an empty session whose quiz-wide lifeline switches come from `lifelines_enabled`.
    pub fn with_lifelines(id: impl Into<String>, lifelines_enabled: BTreeMap<LifelineKind, bool>) -> Self {
        Self {
            lifelines_enabled,
            ..Self::new(id)
        }
    }

    /// Build an empty session in the idle state.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            questions: Vec::new(),
            current_index: None,
            players: IndexMap::new(),
            is_active: false,
            revealed: false,
            clock: QuestionClock::default(),
            ledger: AnswerLedger::default(),
            lifelines_enabled: LifelineKind::full_map(true),
            allowed_emails: Vec::new(),
            sudden_death: SuddenDeath::default(),
            revision: 0,
        }
    }

    /// Whether the current question is paused.
    pub fn paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Current question with its index, if the cursor points inside the question list.
    pub fn current_question(&self) -> Option<(usize, &Question)> {
        let index = self.current_index?;
        self.questions.get(index).map(|question| (index, question))
    }

    /// Replace the question list wholesale, keeping the cursor inside `[-1, len]`.
    pub fn replace_questions(&mut self, questions: Vec<Question>) {
        self.questions = questions;
        if let Some(index) = self.current_index {
            self.current_index = Some(index.min(self.questions.len()));
        }
    }

    /// Elapsed answering time for the current question.
    pub fn elapsed(&self, now: Timestamp) -> f64 {
        self.clock.elapsed(now)
    }

    /// Remaining answering time for the current question, `0` when none is active.
    pub fn remaining(&self, now: Timestamp) -> f64 {
        self.current_question()
            .map(|(_, question)| self.clock.remaining(now, question.duration))
            .unwrap_or(0.0)
    }
}

impl From<ChoiceEntity> for Choice {
    fn from(value: ChoiceEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
        }
    }
}

impl From<Choice> for ChoiceEntity {
    fn from(value: Choice) -> Self {
        Self {
            id: value.id,
            text: value.text,
        }
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            choices: value
                .choices
                .map(|choices| choices.into_iter().map(Into::into).collect()),
            answer: value.answer,
            duration: value.duration,
            hint: value.hint,
        }
    }
}

impl From<Question> for QuestionEntity {
    fn from(value: Question) -> Self {
        Self {
            id: value.id,
            text: value.text,
            choices: value
                .choices
                .map(|choices| choices.into_iter().map(Into::into).collect()),
            answer: value.answer,
            duration: value.duration,
            hint: value.hint,
        }
    }
}

fn lifelines_from_entity(raw: BTreeMap<String, bool>) -> BTreeMap<LifelineKind, bool> {
    let mut lifelines = LifelineKind::full_map(true);
    for (key, value) in raw {
        if let Some(kind) = LifelineKind::parse(&key) {
            lifelines.insert(kind, value);
        }
    }
    lifelines
}

fn lifelines_to_entity(lifelines: &BTreeMap<LifelineKind, bool>) -> BTreeMap<String, bool> {
    lifelines
        .iter()
        .map(|(kind, value)| (kind.as_str().to_string(), *value))
        .collect()
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        let participant_code = value
            .participant_code
            .or_else(|| value.email.as_ref().map(|email| email.trim().to_lowercase()))
            .unwrap_or_default();
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            participant_code,
            score: value.score,
            lifelines: lifelines_from_entity(value.lifelines),
            correct_firsts: value.correct_firsts,
            cumulative_answer_time: value.cumulative_answer_time,
        }
    }
}

impl From<&Player> for PlayerEntity {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
            email: value.email.clone(),
            participant_code: Some(value.participant_code.clone()).filter(|code| !code.is_empty()),
            score: value.score,
            lifelines: lifelines_to_entity(&value.lifelines),
            correct_firsts: value.correct_firsts,
            cumulative_answer_time: value.cumulative_answer_time,
        }
    }
}

impl From<SessionEntity> for QuizSession {
    fn from(value: SessionEntity) -> Self {
        let questions: Vec<Question> = value.questions.into_iter().map(Into::into).collect();
        let current_index = usize::try_from(value.current_index)
            .ok()
            .map(|index| index.min(questions.len()));

        let mut ledger = AnswerLedger::default();
        for (player_id, answer) in value.current_answers {
            let received_at = value
                .current_answer_times
                .get(&player_id)
                .copied()
                .or(value.question_started_at)
                .unwrap_or_default();
            ledger.restore(
                player_id,
                LockedAnswer {
                    value: answer,
                    received_at,
                },
            );
        }

        Self {
            id: value.code.to_uppercase(),
            questions,
            current_index,
            players: value
                .players
                .into_iter()
                .map(|(id, player)| (id, player.into()))
                .collect(),
            is_active: value.is_active,
            revealed: value.revealed,
            clock: QuestionClock::restore(
                value.question_started_at,
                value.paused.then_some(value.paused_at).flatten(),
                value.paused_accumulated,
            ),
            ledger,
            lifelines_enabled: lifelines_from_entity(value.lifelines_enabled),
            allowed_emails: value.allowed_emails,
            sudden_death: SuddenDeath::restore(
                value.sudden_death_active,
                value.sudden_death_allowed,
            ),
            revision: 0,
        }
    }
}

impl From<&QuizSession> for SessionEntity {
    fn from(value: &QuizSession) -> Self {
        Self {
            code: value.id.clone(),
            players: value
                .players
                .iter()
                .map(|(id, player)| (id.clone(), player.into()))
                .collect(),
            questions: value.questions.iter().cloned().map(Into::into).collect(),
            current_index: value
                .current_index
                .and_then(|index| i64::try_from(index).ok())
                .unwrap_or(-1),
            is_active: value.is_active,
            lifelines_enabled: lifelines_to_entity(&value.lifelines_enabled),
            allowed_emails: value.allowed_emails.clone(),
            paused: value.paused(),
            revealed: value.revealed,
            question_started_at: value.clock.started_at(),
            current_answers: value
                .ledger
                .iter()
                .map(|(id, answer)| (id.clone(), answer.value.clone()))
                .collect(),
            paused_at: value.clock.paused_at(),
            paused_accumulated: value.clock.paused_accumulated(),
            current_answer_times: value
                .ledger
                .iter()
                .map(|(id, answer)| (id.clone(), answer.received_at))
                .collect(),
            sudden_death_active: value.sudden_death.is_active(),
            sudden_death_allowed: value.sudden_death.allowed().map(<[PlayerId]>::to_vec),
        }
    }
}
