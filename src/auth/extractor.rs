use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::cookies::AUTH_COOKIE;
use crate::error::AppError;
use crate::models::user::ROLE_ADMIN;
use crate::state::SharedState;

/// The authenticated principal of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }
}

enum TokenLookup {
    Missing,
    Found(String),
}

fn find_token(parts: &Parts) -> Result<TokenLookup, AppError> {
    if let Some(auth_header) = parts.headers.get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(TokenLookup::Found(token.trim().to_string()));
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    match jar.get(AUTH_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => Ok(TokenLookup::Found(cookie.value().to_string())),
        _ => Ok(TokenLookup::Missing),
    }
}

/// Verifies the token, then resolves the principal from the stored account so
/// deleted or re-roled users lose their old rights immediately.
async fn authenticate(token: &str, state: &SharedState) -> Result<AuthUser, AppError> {
    let claims = state
        .sessions
        .verify(token)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(AuthUser {
        user_id: user.id,
        name: user.name,
        role: user.role,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    SharedState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = SharedState::from_ref(state);
        match find_token(parts)? {
            TokenLookup::Found(token) => authenticate(&token, &state).await,
            TokenLookup::Missing => Err(AppError::Unauthorized(
                "Missing authentication token".to_string(),
            )),
        }
    }
}

/// Anonymous, invalid and orphaned sessions resolve to `None`; store
/// failures still surface.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    SharedState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let state = SharedState::from_ref(state);
        let Ok(TokenLookup::Found(token)) = find_token(parts) else {
            return Ok(None);
        };
        match authenticate(&token, &state).await {
            Ok(principal) => Ok(Some(principal)),
            Err(AppError::Unauthorized(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }
}
