//! DTO definitions used by the admin REST API and documentation layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{LeaderboardRowEntity, LeaderboardSnapshotEntity, SnapshotListItemEntity},
    dto::{
        events::{LeaderboardEntry, StatusEvent},
        validation::validate_question_list,
    },
    state::{
        quiz::{Choice, LifelineKind, Question},
        roster::AllowListMode,
    },
};

fn default_duration() -> u32 {
    30
}

/// Choice of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChoiceInput {
    pub id: String,
    pub text: String,
}

/// Question definition as uploaded, exported and stored in the question-set bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuestionInput {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub choices: Option<Vec<ChoiceInput>>,
    /// Expected choice id or free-text answer; omit to accept any answer.
    #[serde(default)]
    pub answer: Option<String>,
    /// Seconds allowed to answer.
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub hint: Option<String>,
}

impl From<QuestionInput> for Question {
    fn from(value: QuestionInput) -> Self {
        Self {
            id: value.id.trim().to_string(),
            text: value.text,
            choices: value.choices.map(|choices| {
                choices
                    .into_iter()
                    .map(|choice| Choice {
                        id: choice.id,
                        text: choice.text,
                    })
                    .collect()
            }),
            answer: value.answer,
            duration: value.duration,
            hint: value.hint,
        }
    }
}

impl From<&Question> for QuestionInput {
    fn from(value: &Question) -> Self {
        Self {
            id: value.id.clone(),
            text: value.text.clone(),
            choices: value.choices.as_ref().map(|choices| {
                choices
                    .iter()
                    .map(|choice| ChoiceInput {
                        id: choice.id.clone(),
                        text: choice.text.clone(),
                    })
                    .collect()
            }),
            answer: value.answer.clone(),
            duration: value.duration,
            hint: value.hint.clone(),
        }
    }
}

/// Wholesale replacement of a session's questions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionsPayload {
    pub questions: Vec<QuestionInput>,
}

impl Validate for QuestionsPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_question_list("questions", &self.questions)
    }
}

/// Store a named question set in the bank.
#[derive(Debug, Deserialize, ToSchema)]
pub struct QuestionSetSaveRequest {
    pub name: String,
    pub questions: Vec<QuestionInput>,
}

impl Validate for QuestionSetSaveRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = match validate_question_list("questions", &self.questions) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if self.name.trim().is_empty() {
            let mut err = validator::ValidationError::new("name_required");
            err.message = Some("Question set name must not be empty".into());
            errors.add("name", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Names a question set of the bank.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct QuestionSetNameRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

/// Bank entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSetItem {
    pub name: String,
    pub count: usize,
}

/// Bank listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSetList {
    pub items: Vec<QuestionSetItem>,
}

/// Acknowledges a stored question set with its file name.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSetSaved {
    pub ok: bool,
    pub file: String,
}

/// Response of the default-session bootstrap.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateQuizResponse {
    pub code: String,
}

/// Optional starting point of a round.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct StartRequest {
    #[serde(default)]
    pub index: Option<usize>,
}

/// Question to jump to.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GotoRequest {
    pub index: usize,
}

/// Outcome of a lifecycle command, with the resulting status projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommandResponse {
    pub ok: bool,
    pub status: StatusEvent,
}

/// Result of a pause toggle.
#[derive(Debug, Serialize, ToSchema)]
pub struct PauseResponse {
    pub ok: bool,
    pub paused: bool,
}

/// Generic acknowledgement with an optional count.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub ok: bool,
    pub count: Option<usize>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            count: None,
        }
    }

    pub fn with_count(count: usize) -> Self {
        Self {
            ok: true,
            count: Some(count),
        }
    }
}

/// Quiz-wide lifeline switches keyed by lifeline type.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LifelinesRequest {
    pub lifelines: BTreeMap<String, bool>,
}

/// Lifeline switches after an update.
#[derive(Debug, Serialize, ToSchema)]
pub struct LifelinesResponse {
    pub ok: bool,
    pub lifelines: BTreeMap<LifelineKind, bool>,
}

/// Allow-list update.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AllowedEmailsRequest {
    pub emails: Vec<String>,
    #[serde(default)]
    pub mode: AllowListMode,
}

/// Current allow-list.
#[derive(Debug, Serialize, ToSchema)]
pub struct AllowedEmailsResponse {
    pub emails: Vec<String>,
    pub count: usize,
}

/// Selects the sudden-death subset: explicit ids win over `topN`, otherwise everyone.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SuddenDeathStartRequest {
    #[serde(default)]
    pub player_ids: Option<Vec<String>>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub top_n: Option<i64>,
}

/// Admin leaderboard row with connection state.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLeaderboardEntry {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub score: i64,
    pub participant_code: String,
    pub online: bool,
    pub firsts: u32,
    pub cum_time: f64,
}

/// Names an archived leaderboard by id or file name.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SnapshotFileRequest {
    #[validate(length(min = 1))]
    pub file: String,
}

/// Archived leaderboard listing entry.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotListItem {
    pub name: String,
    pub file: String,
    pub created_at: String,
    pub created_at_human: String,
    pub count: usize,
    pub code: String,
}

impl From<SnapshotListItemEntity> for SnapshotListItem {
    fn from(value: SnapshotListItemEntity) -> Self {
        Self {
            name: value.name,
            file: value.file,
            created_at: value.created_at,
            created_at_human: value.created_at_human,
            count: value.count,
            code: value.code,
        }
    }
}

/// Archived leaderboards, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotList {
    pub items: Vec<SnapshotListItem>,
}

/// Content of an archived leaderboard.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    pub code: String,
    pub created_at: String,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl From<LeaderboardRowEntity> for LeaderboardEntry {
    fn from(value: LeaderboardRowEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            score: value.score,
            participant_code: value.participant_code.unwrap_or_default(),
            firsts: value.firsts,
            cum_time: value.cum_time,
        }
    }
}

impl From<LeaderboardEntry> for LeaderboardRowEntity {
    fn from(value: LeaderboardEntry) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            score: value.score,
            participant_code: Some(value.participant_code),
            firsts: value.firsts,
            cum_time: value.cum_time,
        }
    }
}

impl From<LeaderboardSnapshotEntity> for LeaderboardSnapshot {
    fn from(value: LeaderboardSnapshotEntity) -> Self {
        Self {
            code: value.code,
            created_at: value.created_at,
            leaderboard: value.leaderboard.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of applying an archived leaderboard to the live session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotApplied {
    pub ok: bool,
    /// Players whose participant code matched a snapshot row.
    pub matched: usize,
    /// Players in the session.
    pub applied: usize,
}

/// Result of an archive purge.
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotsCleared {
    pub ok: bool,
    pub deleted: usize,
}

/// Result of deleting a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteQuizResponse {
    pub ok: bool,
    pub code: String,
    /// Connections closed along with the session.
    pub disconnected: usize,
}

/// Result of forcibly closing player connections.
#[derive(Debug, Serialize, ToSchema)]
pub struct DisconnectResponse {
    pub ok: bool,
    pub disconnected: usize,
}
