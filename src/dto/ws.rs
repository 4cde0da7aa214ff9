use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from WebSocket clients.
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Identify as a registered player.
    #[serde(rename = "join_quiz")]
    JoinQuiz {
        #[serde(default, rename = "sessionId", alias = "code")]
        session_id: Option<String>,
        #[serde(default, rename = "playerId")]
        player_id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
    /// Identify as a read-only display screen.
    #[serde(rename = "display_join")]
    DisplayJoin {
        #[serde(default, rename = "sessionId", alias = "code")]
        session_id: Option<String>,
    },
    /// Identify as an administrator.
    #[serde(rename = "admin_join")]
    AdminJoin {
        #[serde(default, rename = "sessionId", alias = "code")]
        session_id: Option<String>,
        #[serde(default)]
        token: Option<String>,
    },
    #[serde(rename = "submit_answer")]
    SubmitAnswer {
        #[serde(default)]
        #[schema(value_type = Object)]
        answer: serde_json::Value,
    },
    #[serde(rename = "lifeline_request")]
    LifelineRequest {
        #[serde(default)]
        lifeline: Option<String>,
    },
    #[serde(rename = "admin_command")]
    AdminCommand { action: AdminAction },
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Whether the message identifies the connection.
    pub fn is_identification(&self) -> bool {
        matches!(
            self,
            Self::JoinQuiz { .. } | Self::DisplayJoin { .. } | Self::AdminJoin { .. }
        )
    }
}

/// Actions an identified admin socket may trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Next,
    Pause,
    Reveal,
    ShowLeaderboard,
    HideLeaderboard,
    #[serde(other)]
    Unknown,
}

/// Text form of a submitted answer. Non-string JSON values are kept in their JSON form.
pub fn answer_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
