use axum::extract::State;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::extract::{Json, Query};
use crate::models::{ActivityLogEntry, ActivityQuery};
use crate::state::SharedState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParams {
    pub entity_type: Option<String>,
    pub user_id: Option<uuid::Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<ActivityLogEntry>>, AppError> {
    auth.require_admin()?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let page = params.page.unwrap_or(1).max(1);

    let entries = state
        .activity_store
        .list(&ActivityQuery {
            entity_type: params.entity_type.filter(|t| !t.is_empty()),
            user_id: params.user_id,
            limit,
            offset: (page - 1) * limit,
        })
        .await?;

    Ok(Json(entries))
}
