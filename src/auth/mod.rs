//! JWT authentication and password hashing
//!
//! Access tokens live for an hour, refresh tokens for a week. Logout adds
//! the token's JTI to an in-memory blacklist, so revocation lasts until the
//! process restarts (matching the token lifetimes of a single-node deploy).
//! Bcrypt work runs on the blocking pool.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use dashmap::DashSet;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::types::User;

/// Token class carried in the `token_type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// JWT claim set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string
    pub sub: String,
    /// Unique token id, for revocation
    pub jti: String,
    pub roles: Vec<String>,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| Error::Unauthorized("Invalid token subject".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }
}

/// Issues, verifies, and revokes JWTs
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
    blacklist: DashSet<String>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: config.access_token_ttl_secs,
            refresh_ttl: config.refresh_token_ttl_secs,
            blacklist: DashSet::new(),
        }
    }

    /// Mint a token of the given kind for a user
    pub fn issue(&self, user_id: i64, roles: Vec<String>, kind: TokenKind) -> Result<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            roles,
            token_type: kind.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Mint the access/refresh pair handed out at login
    pub fn issue_pair(&self, user: &User) -> Result<(String, String)> {
        let roles = vec![user.role.clone()];
        let access = self.issue(user.id, roles.clone(), TokenKind::Access)?;
        let refresh = self.issue(user.id, roles, TokenKind::Refresh)?;
        Ok((access, refresh))
    }

    /// Verify a token: signature, expiry, kind, and revocation status
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| Error::Unauthorized("Invalid or expired token".to_string()))?;
        let claims = data.claims;

        if claims.token_type != expected.as_str() {
            return Err(Error::Unauthorized("Wrong token type".to_string()));
        }
        if self.blacklist.contains(&claims.jti) {
            return Err(Error::Unauthorized("Token has been revoked".to_string()));
        }
        Ok(claims)
    }

    /// Revoke a token by its JTI (logout)
    pub fn revoke(&self, jti: &str) {
        self.blacklist.insert(jti.to_string());
    }
}

/// Hash a password with bcrypt on the blocking pool
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| Error::Internal(format!("Hash task failed: {}", e)))?
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its bcrypt hash on the blocking pool
pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("Verify task failed: {}", e)))?
        .map_err(|e| Error::Internal(format!("Password verification failed: {}", e)))
}

fn bearer_token(parts: &Parts) -> Result<String> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing Authorization header".to_string()))?;
    header
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
        .ok_or_else(|| Error::Unauthorized("Expected Bearer token".to_string()))
}

/// Extractor for handlers that require a valid access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub claims: Claims,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.auth().verify(&token, TokenKind::Access)?;
        let user_id = claims.user_id()?;
        Ok(AuthUser { user_id, claims })
    }
}

/// Extractor for the refresh endpoint: requires a valid refresh token
#[derive(Debug, Clone)]
pub struct RefreshUser {
    pub user_id: i64,
    pub claims: Claims,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RefreshUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.auth().verify(&token, TokenKind::Refresh)?;
        let user_id = claims.user_id()?;
        Ok(RefreshUser { user_id, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 604800,
            bot_password: "pw".to_string(),
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let auth = service();
        let token = auth
            .issue(42, vec!["user".to_string()], TokenKind::Access)
            .unwrap();
        let claims = auth.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.roles, vec!["user"]);
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let auth = service();
        let refresh = auth
            .issue(1, vec!["user".to_string()], TokenKind::Refresh)
            .unwrap();
        assert!(auth.verify(&refresh, TokenKind::Access).is_err());
        assert!(auth.verify(&refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_revoked_token_rejected() {
        let auth = service();
        let token = auth
            .issue(1, vec!["user".to_string()], TokenKind::Access)
            .unwrap();
        let claims = auth.verify(&token, TokenKind::Access).unwrap();
        auth.revoke(&claims.jti);
        assert!(auth.verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let auth = service();
        let other = AuthService::new(&AuthConfig {
            jwt_secret: "different-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 604800,
            bot_password: "pw".to_string(),
        });
        let token = other
            .issue(1, vec!["admin".to_string()], TokenKind::Access)
            .unwrap();
        assert!(auth.verify(&token, TokenKind::Access).is_err());
    }

    #[tokio::test]
    async fn test_password_roundtrip() {
        let hash = hash_password("hunter2".to_string()).await.unwrap();
        assert!(verify_password("hunter2".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }
}
