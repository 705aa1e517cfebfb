use axum::extract::State;
use serde_json::{json, Value};

use crate::auth::extractor::AuthUser;
use crate::entities;
use crate::error::AppError;
use crate::extract::Json;
use crate::state::SharedState;

pub async fn summary(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let counts = entities::counts(&state).await?;
    let users = state.users.count().await?;

    Ok(Json(json!({
        "counts": counts,
        "users": users,
    })))
}
