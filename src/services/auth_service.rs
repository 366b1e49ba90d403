//! Domain service for agent accounts.
//!
//! Handles registration, credential checks and profile changes.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::db::ProfileUpdate;
use crate::domain::AgentId;
use crate::domain::entitlement::EntitlementSnapshot;
use crate::models::Agent;

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Agent not found")]
    AgentNotFound,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// The signed-in agent together with what they may do right now.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub agent: Agent,
    pub entitlement: EntitlementSnapshot,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a trial account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailTaken`] when the email is already registered.
    async fn register(&self, registration: Registration) -> Result<Agent, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a wrong password.
    async fn login(&self, email: &str, password: &str) -> Result<Agent, AuthError>;

    async fn account(&self, agent_id: AgentId) -> Result<AccountView, AuthError>;

    async fn update_profile(
        &self,
        agent_id: AgentId,
        update: ProfileUpdate,
    ) -> Result<Agent, AuthError>;
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid regex")
    })
}

/// Lowercased, trimmed email, or a validation message.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    if !email_regex().is_match(&email) {
        return Err(AuthError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), AuthError> {
    if password.chars().count() < min_length {
        return Err(AuthError::Validation(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AuthError::Validation(
            "Password must contain at least one letter and one number".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.COM ").unwrap(),
            "jane.doe@example.com"
        );
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("abc12345", 8).is_ok());
        assert!(validate_password("abc1234", 8).is_err());
        assert!(validate_password("abcdefgh", 8).is_err());
        assert!(validate_password("12345678", 8).is_err());
    }
}
