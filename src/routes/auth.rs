use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::activity::{Actor, RequestContext};
use crate::auth::cookies::{clear_auth_cookies, set_auth_cookie};
use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::error::AppError;
use crate::extract::Json;
use crate::models::user::ROLE_ADMIN;
use crate::models::{ActivityType, NewActivity, NewUser, User};
use crate::resource::{require, require_email};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub password: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn issue_session(
    state: &SharedState,
    user: &User,
    jar: CookieJar,
) -> Result<(CookieJar, String), AppError> {
    let token = state.sessions.issue(user).map_err(AppError::Internal)?;
    Ok((set_auth_cookie(jar, &token, state.sessions.ttl_secs()), token))
}

/// Creates the first administrator. Closed once any user exists.
pub async fn register(
    State(state): State<SharedState>,
    jar: CookieJar,
    ctx: RequestContext,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), AppError> {
    require("name", "Name", &req.name)?;
    require_email("email", &req.email)?;
    password::check_length(&req.password).map_err(AppError::BadRequest)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let _guard = state.registration.lock().await;
    if state.users.count().await? > 0 {
        return Err(AppError::Forbidden(
            "Registration is disabled. Contact your system administrator.".to_string(),
        ));
    }

    let user = state
        .users
        .create(NewUser {
            email: req.email.trim().to_lowercase(),
            password_hash: pw_hash,
            name: req.name.trim().to_string(),
            role: ROLE_ADMIN.to_string(),
        })
        .await?;

    state.activity.record(
        NewActivity::new(
            Actor::User(user.id),
            ActivityType::Create,
            "User",
            format!("Registered administrator: {}", user.email),
        )
        .entity_id(user.id)
        .context(&ctx),
    );

    let (jar, token) = issue_session(&state, &user, jar)?;
    Ok((StatusCode::CREATED, jar, Json(SessionResponse { token, user })))
}

pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    ctx: RequestContext,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    if state.login_limiter.check(&req.email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let user = state
        .users
        .find_by_email(req.email.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        state.login_limiter.record_failure(&req.email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }
    state.login_limiter.clear(&req.email);

    state.activity.record(
        NewActivity::new(
            Actor::User(user.id),
            ActivityType::Login,
            "User",
            format!("User logged in: {}", user.email),
        )
        .entity_id(user.id)
        .context(&ctx),
    );

    let (jar, token) = issue_session(&state, &user, jar)?;
    Ok((jar, Json(SessionResponse { token, user })))
}

/// Always succeeds; the LOGOUT entry is only written for a valid session.
pub async fn logout(
    State(state): State<SharedState>,
    principal: Option<AuthUser>,
    jar: CookieJar,
    ctx: RequestContext,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(auth) = principal {
        state.activity.record(
            NewActivity::new(
                Actor::from(&auth),
                ActivityType::Logout,
                "User",
                format!("User logged out: {}", auth.name),
            )
            .entity_id(auth.user_id)
            .context(&ctx),
        );
    }

    (
        clear_auth_cookies(jar),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

pub async fn me(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = state
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
    Ok(Json(user))
}
