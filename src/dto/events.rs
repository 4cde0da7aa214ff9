//! Event catalogue pushed to players, displays and admins.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::state::{
    ledger::RejectReason,
    quiz::LifelineKind,
};

#[derive(Clone, Debug)]
/// Serialized event as carried across broadcast rooms and direct connections.
pub struct ServerEvent {
    pub event: Option<String>,
    /// Full `{"event": .., "data": ..}` frame.
    pub data: String,
}

impl ServerEvent {
    /// Serialize a catalogue event into its wire frame.
    pub fn from_quiz_event(event: &QuizEvent) -> serde_json::Result<Self> {
        Ok(Self {
            event: Some(event.name().to_string()),
            data: serde_json::to_string(event)?,
        })
    }
}

/// Every event the engine can emit, serialized as `{"event": name, "data": payload}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum QuizEvent {
    Question(QuestionEvent),
    Status(StatusEvent),
    Reveal(RevealEvent),
    AnswerResult(AnswerResultEvent),
    AnswerLocked(AnswerLockedEvent),
    AnswerRejected(AnswerRejectedEvent),
    AnswerSubmitted(AnswerSubmittedEvent),
    AnswersProgress(AnswersProgressEvent),
    Leaderboard(Vec<LeaderboardEntry>),
    LeaderboardShow(Vec<LeaderboardEntry>),
    LeaderboardHide {},
    LifelineStatus(BTreeMap<LifelineKind, bool>),
    Lifelines(BTreeMap<LifelineKind, bool>),
    #[serde(rename = "lifeline_5050")]
    LifelineFiftyFifty(FiftyFiftyEvent),
    LifelineHint(HintEvent),
    LifelineAck(LifelineRef),
    LifelineUsed(LifelineUsedEvent),
    LifelineDenied(LifelineRef),
    SuddenDeath(SuddenDeathEvent),
    FinalResults(FinalResultsEvent),
    Paused(SessionRef),
    Resumed(SessionRef),
    Reset(SessionRef),
    Complete {},
    Joined(JoinedEvent),
    AdminJoined(AdminJoinedEvent),
    Replaced(ReplacedEvent),
    Error(ErrorEvent),
}

impl QuizEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            QuizEvent::Question(_) => "question",
            QuizEvent::Status(_) => "status",
            QuizEvent::Reveal(_) => "reveal",
            QuizEvent::AnswerResult(_) => "answer_result",
            QuizEvent::AnswerLocked(_) => "answer_locked",
            QuizEvent::AnswerRejected(_) => "answer_rejected",
            QuizEvent::AnswerSubmitted(_) => "answer_submitted",
            QuizEvent::AnswersProgress(_) => "answers_progress",
            QuizEvent::Leaderboard(_) => "leaderboard",
            QuizEvent::LeaderboardShow(_) => "leaderboard_show",
            QuizEvent::LeaderboardHide {} => "leaderboard_hide",
            QuizEvent::LifelineStatus(_) => "lifeline_status",
            QuizEvent::Lifelines(_) => "lifelines",
            QuizEvent::LifelineFiftyFifty(_) => "lifeline_5050",
            QuizEvent::LifelineHint(_) => "lifeline_hint",
            QuizEvent::LifelineAck(_) => "lifeline_ack",
            QuizEvent::LifelineUsed(_) => "lifeline_used",
            QuizEvent::LifelineDenied(_) => "lifeline_denied",
            QuizEvent::SuddenDeath(_) => "sudden_death",
            QuizEvent::FinalResults(_) => "final_results",
            QuizEvent::Paused(_) => "paused",
            QuizEvent::Resumed(_) => "resumed",
            QuizEvent::Reset(_) => "reset",
            QuizEvent::Complete {} => "complete",
            QuizEvent::Joined(_) => "joined",
            QuizEvent::AdminJoined(_) => "admin_joined",
            QuizEvent::Replaced(_) => "replaced",
            QuizEvent::Error(_) => "error",
        }
    }

    /// Shorthand for an `error{message}` event.
    pub fn error(message: impl Into<String>) -> Self {
        QuizEvent::Error(ErrorEvent {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChoiceView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Question as shown to players: the expected answer is always withheld.
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub choices: Option<Vec<ChoiceView>>,
    /// Always `null` on the wire.
    pub answer: Option<String>,
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEvent {
    pub question: QuestionView,
    pub index: usize,
    pub duration: u32,
    pub started_at: Option<f64>,
    pub server_time: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Progress of the current round. `index` is `-1` before the first question.
pub struct StatusEvent {
    pub index: i64,
    pub total: usize,
    pub paused: bool,
    pub revealed: bool,
    pub duration: Option<u32>,
    pub started_at: Option<f64>,
    pub server_time: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealEvent {
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnswerResultEvent {
    pub correct: bool,
    pub score: i64,
    pub rank: Option<usize>,
    pub awarded: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnswerLockedEvent {
    pub locked: bool,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnswerRejectedEvent {
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmittedEvent {
    pub player_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Minimal player reference used in progress lists.
pub struct PlayerRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Who has locked an answer for the current question.
pub struct AnswersProgressEvent {
    pub locked_count: usize,
    pub players_count: usize,
    pub locked: Vec<PlayerRef>,
    pub players: Vec<PlayerRef>,
    pub unlocked: Vec<PlayerRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Ranked leaderboard row with tie-break statistics.
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub score: i64,
    pub participant_code: String,
    pub firsts: u32,
    /// Cumulative correct-answer time, rounded to milliseconds.
    pub cum_time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FiftyFiftyEvent {
    pub keep_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HintEvent {
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LifelineRef {
    pub lifeline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifelineUsedEvent {
    pub player_id: String,
    pub name: String,
    pub lifeline: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SuddenDeathEvent {
    pub active: bool,
    pub allowed: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FinalResultsEvent {
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SessionRef {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinedEvent {
    pub ok: bool,
    pub participant_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AdminJoinedEvent {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReplacedEvent {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ErrorEvent {
    pub message: String,
}
