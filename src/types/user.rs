//! User account types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Roles a user account can hold
pub const USER_ROLES: &[&str] = &["user", "admin", "assistant"];

/// A user account row
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public view of the account (no password material)
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
        }
    }

    /// Whether this account has admin privileges
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Serializable user representation returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// POST /api/auth/register
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl RegisterRequest {
    /// Field-level validation before hashing and insert
    pub fn validate(&self) -> Result<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(Error::Validation("Password is required".to_string()));
        }
        if let Some(role) = &self.role {
            if !USER_ROLES.contains(&role.as_str()) {
                return Err(Error::Validation(format!("Invalid role: {}", role)));
            }
        }
        Ok(())
    }
}

/// POST /api/auth/login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// PUT /api/auth/profile
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/auth/change-password
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Tokens returned by a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserView,
}

/// Usernames must be at least 3 characters long
pub fn validate_username(username: &str) -> Result<()> {
    if username.chars().count() < 3 {
        return Err(Error::Validation(
            "Username must be at least 3 characters long.".to_string(),
        ));
    }
    Ok(())
}

/// Minimal email shape check: requires an `@` and a dot
pub fn validate_email(email: &str) -> Result<()> {
    if !email.contains('@') || !email.contains('.') {
        return Err(Error::Validation("Invalid email address.".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_validation() {
        assert!(validate_username("al").is_err());
        assert!(validate_username("ali").is_ok());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@dot").is_err());
        assert!(validate_email("alice@test.com").is_ok());
    }

    #[test]
    fn test_register_validation() {
        let req = RegisterRequest {
            username: "alice".to_string(),
            email: "alice@test.com".to_string(),
            password: "secret".to_string(),
            role: None,
        };
        assert!(req.validate().is_ok());

        let bad_role = RegisterRequest {
            role: Some("superuser".to_string()),
            ..req
        };
        assert!(bad_role.validate().is_err());
    }
}
