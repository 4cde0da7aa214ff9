use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Registration form submitted before joining a quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    pub name: String,
    #[validate(custom(function = "crate::dto::validation::validate_email_format"))]
    pub email: String,
}

/// Identity returned to a registered player.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub player_id: String,
    pub participant_code: String,
}

/// Public leaderboard row: name and score only.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicLeaderboardEntry {
    pub name: String,
    pub score: i64,
}

/// Optional session selector on public routes; the configured default session otherwise.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionQuery {
    pub session: Option<String>,
}

/// Whether the requested session exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
}
