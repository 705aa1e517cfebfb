use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::activity::{Actor, RequestContext};
use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::db::StoreError;
use crate::error::AppError;
use crate::extract::Json;
use crate::models::user::{ROLE_ADMIN, ROLE_MEMBER};
use crate::models::{ActivityType, NewActivity, NewUser, User, UserChanges};
use crate::resource::handlers::snapshot;
use crate::resource::{require, require_email, require_if_present};
use crate::state::SharedState;

const ENTITY_TYPE: &str = "User";

#[derive(Deserialize)]
pub struct CreateUser {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

fn check_role(role: Option<&str>) -> Result<(), AppError> {
    match role {
        Some(r) if r != ROLE_ADMIN && r != ROLE_MEMBER => Err(AppError::BadRequest(
            "Role must be admin or member".to_string(),
        )),
        _ => Ok(()),
    }
}

fn user_error(err: StoreError) -> AppError {
    match err {
        StoreError::Conflict(_) => {
            AppError::Conflict("A user with this email already exists".to_string())
        }
        other => other.into(),
    }
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| user_not_found())
}

fn log(
    state: &SharedState,
    auth: &AuthUser,
    ctx: &RequestContext,
    activity_type: ActivityType,
    user: &User,
    description: String,
    metadata: Value,
) {
    state.activity.record(
        NewActivity::new(Actor::from(auth), activity_type, ENTITY_TYPE, description)
            .entity_id(user.id)
            .metadata(metadata)
            .context(ctx),
    );
}

pub async fn list(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list().await?))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    ctx: RequestContext,
    Json(req): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    auth.require_admin()?;

    require("name", "Name", &req.name)?;
    require_email("email", &req.email)?;
    password::check_length(&req.password).map_err(AppError::BadRequest)?;
    check_role(req.role.as_deref())?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;
    let user = state
        .users
        .create(NewUser {
            email: req.email.trim().to_lowercase(),
            password_hash: pw_hash,
            name: req.name.trim().to_string(),
            role: req.role.unwrap_or_else(|| ROLE_MEMBER.to_string()),
        })
        .await
        .map_err(user_error)?;

    log(
        &state,
        &auth,
        &ctx,
        ActivityType::Create,
        &user,
        format!("Created user: {}", user.email),
        json!({ "newData": snapshot(&user) }),
    );

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateUser>,
) -> Result<Json<User>, AppError> {
    auth.require_admin()?;

    require_if_present("name", "Name", req.name.as_deref())?;
    if let Some(email) = req.email.as_deref() {
        require_email("email", email)?;
    }
    if let Some(pw) = req.password.as_deref() {
        password::check_length(pw).map_err(AppError::BadRequest)?;
    }
    check_role(req.role.as_deref())?;

    let id = parse_user_id(&id)?;
    let existing = state.users.find_by_id(id).await?.ok_or_else(user_not_found)?;

    let password_hash = match req.password.as_deref() {
        Some(pw) => Some(password::hash(pw).map_err(AppError::Internal)?),
        None => None,
    };

    let updated = state
        .users
        .update(
            id,
            UserChanges {
                email: req.email.map(|e| e.trim().to_lowercase()),
                password_hash,
                name: req.name.map(|n| n.trim().to_string()),
                role: req.role,
            },
        )
        .await
        .map_err(user_error)?
        .ok_or_else(user_not_found)?;

    log(
        &state,
        &auth,
        &ctx,
        ActivityType::Update,
        &updated,
        format!("Updated user: {}", updated.email),
        json!({ "oldData": snapshot(&existing), "newData": snapshot(&updated) }),
    );

    Ok(Json(updated))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    auth.require_admin()?;

    let id = parse_user_id(&id)?;
    if id == auth.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let existing = state.users.find_by_id(id).await?.ok_or_else(user_not_found)?;
    if !state.users.delete(id).await? {
        return Err(user_not_found());
    }

    log(
        &state,
        &auth,
        &ctx,
        ActivityType::Delete,
        &existing,
        format!("Deleted user: {}", existing.email),
        json!({ "oldData": snapshot(&existing) }),
    );

    Ok(Json(json!({ "message": "User deleted" })))
}
