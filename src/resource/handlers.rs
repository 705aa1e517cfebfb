use axum::extract::{FromRef, Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{capitalize, Collection, ListQuery, Record, Resource, Validate};
use crate::activity::{Actor, RequestContext};
use crate::auth::extractor::AuthUser;
use crate::db::StoreError;
use crate::error::AppError;
use crate::extract::{Json, Query};
use crate::models::{ActivityType, NewActivity};
use crate::state::SharedState;

/// Router state for one resource type.
pub struct ResourceState<R> {
    pub app: SharedState,
    pub collection: Collection<R>,
    pub public_read: bool,
}

impl<R> Clone for ResourceState<R> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            collection: self.collection.clone(),
            public_read: self.public_read,
        }
    }
}

impl<R> FromRef<ResourceState<R>> for SharedState {
    fn from_ref(state: &ResourceState<R>) -> Self {
        state.app.clone()
    }
}

impl<R: Resource> ResourceState<R> {
    pub fn new(app: &SharedState) -> Self {
        let public_read = app.config.is_public_read(R::ENTITY_TYPE, R::PUBLIC_READ);
        Self {
            app: app.clone(),
            collection: Collection::new(app.documents.clone()),
            public_read,
        }
    }

    pub fn authorize_read(&self, principal: Option<&AuthUser>) -> Result<(), AppError> {
        if self.public_read || principal.is_some() {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "Missing authentication token".to_string(),
            ))
        }
    }

    /// Publishes an activity entry for a change to a record of this type.
    pub fn log(
        &self,
        auth: &AuthUser,
        ctx: &RequestContext,
        activity_type: ActivityType,
        id: Uuid,
        description: String,
        metadata: Value,
    ) {
        self.app.activity.record(
            NewActivity::new(Actor::from(auth), activity_type, R::ENTITY_TYPE, description)
                .entity_id(id)
                .metadata(metadata)
                .context(ctx),
        );
    }

    pub async fn load(&self, raw_id: &str) -> Result<Record<R>, AppError> {
        let id = parse_id::<R>(raw_id)?;
        self.collection
            .find_by_id(id)
            .await?
            .ok_or_else(not_found::<R>)
    }
}

pub fn not_found<R: Resource>() -> AppError {
    AppError::NotFound(format!("{} not found", capitalize(R::LABEL)))
}

/// Ids that are not UUIDs cannot exist, so they are reported as not found.
pub fn parse_id<R: Resource>(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| not_found::<R>())
}

pub fn store_error<R: Resource>(err: StoreError) -> AppError {
    match err {
        StoreError::Conflict(_) => AppError::Conflict(format!(
            "{} with this {} already exists",
            capitalize(R::LABEL),
            R::UNIQUE_FIELD
        )),
        other => other.into(),
    }
}

pub fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub async fn list<R: Resource>(
    State(rs): State<ResourceState<R>>,
    principal: Option<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Record<R>>>, AppError> {
    rs.authorize_read(principal.as_ref())?;
    let records = rs.collection.find(&query).await?;
    Ok(Json(records))
}

pub async fn get<R: Resource>(
    State(rs): State<ResourceState<R>>,
    principal: Option<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Record<R>>, AppError> {
    rs.authorize_read(principal.as_ref())?;
    Ok(Json(rs.load(&id).await?))
}

pub async fn create<R: Resource>(
    State(rs): State<ResourceState<R>>,
    auth: AuthUser,
    ctx: RequestContext,
    Json(draft): Json<R::Draft>,
) -> Result<(StatusCode, Json<Record<R>>), AppError> {
    draft.validate()?;

    let record = rs
        .collection
        .create(R::from_draft(draft))
        .await
        .map_err(store_error::<R>)?;

    rs.log(
        &auth,
        &ctx,
        ActivityType::Create,
        record.id,
        format!("Created {}: {}", R::LABEL, record.data.title()),
        json!({ "newData": snapshot(&record) }),
    );

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update<R: Resource>(
    State(rs): State<ResourceState<R>>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<String>,
    Json(patch): Json<R::Patch>,
) -> Result<Json<Record<R>>, AppError> {
    patch.validate()?;

    let existing = rs.load(&id).await?;
    let mut data = existing.data.clone();
    data.apply(patch);
    data.check()?;

    let updated = rs
        .collection
        .update(existing.id, data)
        .await
        .map_err(store_error::<R>)?
        .ok_or_else(not_found::<R>)?;

    rs.log(
        &auth,
        &ctx,
        ActivityType::Update,
        updated.id,
        format!("Updated {}: {}", R::LABEL, updated.data.title()),
        json!({ "oldData": snapshot(&existing), "newData": snapshot(&updated) }),
    );

    Ok(Json(updated))
}

pub async fn delete<R: Resource>(
    State(rs): State<ResourceState<R>>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let existing = rs.load(&id).await?;

    if !rs.collection.delete(existing.id).await? {
        return Err(not_found::<R>());
    }

    rs.log(
        &auth,
        &ctx,
        ActivityType::Delete,
        existing.id,
        format!("Deleted {}: {}", R::LABEL, existing.data.title()),
        json!({ "oldData": snapshot(&existing) }),
    );

    Ok(Json(json!({
        "message": format!("{} deleted", capitalize(R::LABEL))
    })))
}
