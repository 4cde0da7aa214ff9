use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn default_duration() -> u32 {
    30
}

fn default_index() -> i64 {
    -1
}

/// Choice of a multiple-choice question as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceEntity {
    pub id: String,
    pub text: String,
}

/// Question definition shared by session snapshots and the question-set bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub choices: Option<Vec<ChoiceEntity>>,
    /// Expected choice id or free-text answer.
    #[serde(default)]
    pub answer: Option<String>,
    /// Seconds allowed to answer.
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub hint: Option<String>,
}

/// Registered player with running statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub participant_code: Option<String>,
    #[serde(default)]
    pub score: i64,
    /// Lifeline name to availability.
    #[serde(default)]
    pub lifelines: BTreeMap<String, bool>,
    #[serde(default)]
    pub correct_firsts: u32,
    #[serde(default)]
    pub cumulative_answer_time: f64,
}

/// Complete snapshot of a quiz session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntity {
    /// Session identifier.
    pub code: String,
    #[serde(default)]
    pub players: IndexMap<String, PlayerEntity>,
    #[serde(default)]
    pub questions: Vec<QuestionEntity>,
    /// `-1` before the first question, `questions.len()` once complete.
    #[serde(default = "default_index")]
    pub current_index: i64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub lifelines_enabled: BTreeMap<String, bool>,
    #[serde(default)]
    pub allowed_emails: Vec<String>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub revealed: bool,
    #[serde(default)]
    pub question_started_at: Option<f64>,
    /// Locked answers of the current question, in lock order.
    #[serde(default)]
    pub current_answers: IndexMap<String, String>,
    #[serde(default)]
    pub paused_at: Option<f64>,
    #[serde(default)]
    pub paused_accumulated: f64,
    /// Receipt time of each locked answer.
    #[serde(default)]
    pub current_answer_times: IndexMap<String, f64>,
    #[serde(default)]
    pub sudden_death_active: bool,
    #[serde(default)]
    pub sudden_death_allowed: Option<Vec<String>>,
}

/// Leaderboard row archived after each settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRowEntity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub score: i64,
    #[serde(default)]
    pub participant_code: Option<String>,
    #[serde(default)]
    pub firsts: u32,
    #[serde(default)]
    pub cum_time: f64,
}

/// Archived leaderboard file content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshotEntity {
    pub code: String,
    /// Compact UTC timestamp, `YYYYMMDD_HHMMSS_mmm`.
    pub created_at: String,
    pub leaderboard: Vec<LeaderboardRowEntity>,
}

/// Listing entry describing an archived leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotListItemEntity {
    /// Snapshot id, the file name without extension.
    pub name: String,
    pub file: String,
    pub created_at: String,
    pub created_at_human: String,
    pub count: usize,
    pub code: String,
}

/// Question set summary from the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSetListItemEntity {
    pub name: String,
    pub count: usize,
}
