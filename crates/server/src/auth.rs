//! Password and cookie-session authentication

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use faturai_storage::{StorageError, User};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppError, AppState};

pub const SESSION_COOKIE: &str = "faturai_session";

const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| anyhow::anyhow!("salt encoding failed: {e}"))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

fn session_cookie(state: &AppState, token: &str, max_age_secs: i64) -> Result<HeaderValue, AppError> {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if state.config.secure_cookies {
        cookie.push_str("; Secure");
    }
    Ok(HeaderValue::from_str(&cookie)?)
}

async fn start_session(state: &AppState, user: &User) -> Result<HeaderValue, AppError> {
    let token = Uuid::new_v4().to_string();
    let ttl = Duration::hours(state.config.session_ttl_hours);
    faturai_storage::create_session(&state.db, &hash_token(&token), user.id, Utc::now() + ttl)
        .await?;
    session_cookie(state, &token, ttl.num_seconds())
}

/// The user behind the request's session cookie. Rejects with 401 when the
/// cookie is missing, unknown or expired.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;
        faturai_storage::get_session_user(&state.db, &hash_token(&token), Utc::now())
            .await?
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// POST /api/register - create an account and log it in
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Result<Response, AppError> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("Username is required"));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("Password must have at least 6 characters"));
    }

    let password_hash = hash_password(&body.password)?;
    let user = match faturai_storage::create_user(&state.db, username, &password_hash).await {
        Ok(user) => user,
        Err(StorageError::UsernameTaken(_)) => {
            return Err(AppError::bad_request("Username already exists"));
        }
        Err(e) => return Err(e.into()),
    };
    info!(user = %user.username, "Registered user");

    let cookie = start_session(&state, &user).await?;
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(user)).into_response())
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Result<Response, AppError> {
    let user = faturai_storage::get_user_by_username(&state.db, body.username.trim())
        .await?
        .filter(|u| verify_password(&body.password, &u.password_hash));
    let Some(user) = user else {
        warn!(user = %body.username.trim(), "Failed login");
        return Err(AppError::unauthorized("Invalid username or password"));
    };

    let cookie = start_session(&state, &user).await?;
    Ok(([(header::SET_COOKIE, cookie)], Json(user)).into_response())
}

/// POST /api/logout - drops the session; succeeds even without one
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        faturai_storage::delete_session(&state.db, &hash_token(&token)).await?;
    }
    let cookie = session_cookie(&state, "", 0)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response())
}

/// GET /api/user
pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
