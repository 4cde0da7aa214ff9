//! Player registration and the registration allow-list.

use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::quiz::{Player, PlayerId, QuizSession};

/// Reasons a registration is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("email required")]
    EmailRequired,
    #[error("name required")]
    NameRequired,
    #[error("email not allowed")]
    EmailNotAllowed,
}

/// Identity handed back to a registering player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub player_id: PlayerId,
    pub participant_code: String,
    /// `false` when an existing player was matched by email.
    pub created: bool,
}

/// How an allow-list update combines with the current list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AllowListMode {
    #[default]
    Replace,
    Append,
    Remove,
}

/// Trim and lower-case an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl QuizSession {
    /// Register a player, or return the existing one with the same normalized email.
    pub fn register(&mut self, name: &str, email: &str) -> Result<Registration, RegistrationError> {
        let email_key = normalize_email(email);
        if email_key.is_empty() {
            return Err(RegistrationError::EmailRequired);
        }
        if !self.allowed_emails.is_empty()
            && !self
                .allowed_emails
                .iter()
                .any(|allowed| allowed.to_lowercase() == email_key)
        {
            return Err(RegistrationError::EmailNotAllowed);
        }

        if let Some(existing) = self.players.values().find(|player| {
            player
                .email
                .as_deref()
                .is_some_and(|existing| normalize_email(existing) == email_key)
        }) {
            let participant_code = if existing.participant_code.is_empty() {
                email_key
            } else {
                existing.participant_code.clone()
            };
            return Ok(Registration {
                player_id: existing.id.clone(),
                participant_code,
                created: false,
            });
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(RegistrationError::NameRequired);
        }
        let player_id = Uuid::new_v4().simple().to_string();
        let player = Player::new(
            player_id.clone(),
            name.to_string(),
            Some(email.trim().to_string()),
            email_key.clone(),
        );
        self.players.insert(player_id.clone(), player);
        Ok(Registration {
            player_id,
            participant_code: email_key,
            created: true,
        })
    }

    /// Fill in a missing email or participant code when a known player joins.
    ///
    /// Returns whether the player record changed.
    pub fn sync_identity(&mut self, player_id: &str, email: Option<&str>) -> bool {
        let Some(player) = self.players.get_mut(player_id) else {
            return false;
        };
        let mut changed = false;
        if let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) {
            if player.email.is_none() {
                player.email = Some(email.to_string());
                changed = true;
            }
        }
        if player.participant_code.is_empty() {
            if let Some(email) = player.email.as_deref() {
                player.participant_code = normalize_email(email);
                changed = true;
            }
        }
        changed
    }

    /// Update the allow-list and return it.
    pub fn update_allowed_emails(&mut self, emails: &[String], mode: AllowListMode) -> &[String] {
        let mut normalized: Vec<String> = Vec::with_capacity(emails.len());
        for email in emails.iter().map(|email| normalize_email(email)) {
            if !email.is_empty() && !normalized.contains(&email) {
                normalized.push(email);
            }
        }
        match mode {
            AllowListMode::Replace => self.allowed_emails = normalized,
            AllowListMode::Append => {
                for email in normalized {
                    if !self.allowed_emails.contains(&email) {
                        self.allowed_emails.push(email);
                    }
                }
            }
            AllowListMode::Remove => self
                .allowed_emails
                .retain(|existing| !normalized.contains(existing)),
        }
        &self.allowed_emails
    }
}
