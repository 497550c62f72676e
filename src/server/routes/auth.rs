//! Authentication and account endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::auth::{self, AuthUser, RefreshUser, TokenKind};
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest,
    UserView,
};

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>)> {
    request.validate()?;

    if state.db().username_exists(&request.username, None)? {
        return Err(Error::Conflict("Username already exists".to_string()));
    }
    if state.db().email_exists(&request.email, None)? {
        return Err(Error::Conflict("Email already registered".to_string()));
    }

    let hash = auth::hash_password(request.password).await?;
    let role = request.role.as_deref().unwrap_or("user");
    let user = state
        .db()
        .create_user(&request.username, &request.email, &hash, role)?;

    tracing::info!(username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user.view())))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state
        .db()
        .get_user_by_username(&request.username)?
        .ok_or_else(|| Error::Unauthorized("Invalid username or password".to_string()))?;

    let valid = auth::verify_password(request.password, user.password_hash.clone()).await?;
    if !valid {
        return Err(Error::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let (access_token, refresh_token) = state.auth().issue_pair(&user)?;
    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        user: user.view(),
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    user: RefreshUser,
) -> Result<Json<serde_json::Value>> {
    let access_token = state
        .auth()
        .issue(user.user_id, user.claims.roles, TokenKind::Access)?;
    Ok(Json(json!({ "access_token": access_token })))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<serde_json::Value>> {
    state.auth().revoke(&user.claims.jti);
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// GET /api/auth/profile
pub async fn profile(State(state): State<AppState>, user: AuthUser) -> Result<Json<UserView>> {
    let record = state
        .db()
        .get_user(user.user_id)?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
    Ok(Json(record.view()))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserView>> {
    let record = state
        .db()
        .get_user(user.user_id)?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    if let Some(username) = &request.username {
        crate::types::user::validate_username(username)?;
        if state.db().username_exists(username, Some(record.id))? {
            return Err(Error::Conflict("Username already exists".to_string()));
        }
    }
    if let Some(email) = &request.email {
        crate::types::user::validate_email(email)?;
        if state.db().email_exists(email, Some(record.id))? {
            return Err(Error::Conflict("Email already registered".to_string()));
        }
    }

    state.db().update_user_profile(
        record.id,
        request.username.as_deref(),
        request.email.as_deref(),
    )?;

    let updated = state
        .db()
        .get_user(record.id)?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
    Ok(Json(updated.view()))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    if request.old_password.is_empty() || request.new_password.is_empty() {
        return Err(Error::Validation(
            "Old and new passwords are required".to_string(),
        ));
    }

    let record = state
        .db()
        .get_user(user.user_id)?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    let valid =
        auth::verify_password(request.old_password, record.password_hash.clone()).await?;
    if !valid {
        return Err(Error::Unauthorized("Old password is incorrect".to_string()));
    }

    let hash = auth::hash_password(request.new_password).await?;
    state.db().update_password(record.id, &hash)?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// GET /api/auth/users (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<serde_json::Value>> {
    let current = state
        .db()
        .get_user(user.user_id)?
        .ok_or_else(|| Error::Forbidden("Admin access required".to_string()))?;
    if !current.is_admin() {
        return Err(Error::Forbidden("Admin access required".to_string()));
    }

    let users: Vec<UserView> = state.db().list_users()?.iter().map(|u| u.view()).collect();
    Ok(Json(json!({
        "status": "success",
        "count": users.len(),
        "data": users,
    })))
}
