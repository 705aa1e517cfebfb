use axum::extract::State;
use axum::routing::put;
use axum::Router;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_date_range, parse_date};
use crate::activity::{Actor, RequestContext};
use crate::auth::extractor::AuthUser;
use crate::db::SortOrder;
use crate::error::AppError;
use crate::extract::Json;
use crate::form::FormModel;
use crate::models::{ActivityType, NewActivity};
use crate::resource::handlers::{not_found, store_error};
use crate::resource::{
    normalize_key, require, require_if_present, resource_router, FieldError, Record, Resource,
    ResourceState, Validate,
};
use crate::state::SharedState;

/// A management term. Most other records are scoped to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub is_active: bool,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub is_active: bool,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodPatch {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

impl Validate for PeriodDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("name", "Name", &self.name)?;
        check_date_range(self.start_date, self.end_date)
    }
}

impl Validate for PeriodPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("name", "Name", self.name.as_deref())?;
        check_date_range(self.start_date, self.end_date)
    }
}

impl FormModel for PeriodDraft {
    fn set_field(&mut self, field: &str, value: &str) -> bool {
        match field {
            "name" => self.name = value.to_string(),
            "startDate" => self.start_date = parse_date(value),
            "endDate" => self.end_date = parse_date(value),
            "isActive" => self.is_active = matches!(value, "true" | "on" | "1"),
            "order" => self.order = value.trim().parse().ok(),
            _ => return false,
        }
        true
    }
}

impl Resource for Period {
    const ENTITY_TYPE: &'static str = "Period";
    const PATH: &'static str = "period";
    const LABEL: &'static str = "period";
    const PUBLIC_READ: bool = true;

    type Draft = PeriodDraft;
    type Patch = PeriodPatch;

    fn from_draft(draft: PeriodDraft) -> Self {
        Self {
            name: draft.name.trim().to_string(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            is_active: draft.is_active,
            order: draft.order,
        }
    }

    fn apply(&mut self, patch: PeriodPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if patch.start_date.is_some() {
            self.start_date = patch.start_date;
        }
        if patch.end_date.is_some() {
            self.end_date = patch.end_date;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if patch.order.is_some() {
            self.order = patch.order;
        }
    }

    fn check(&self) -> Result<(), FieldError> {
        check_date_range(self.start_date, self.end_date)
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.name))
    }

    fn sort_order() -> SortOrder {
        SortOrder::Number("order")
    }

    fn search_fields() -> &'static [&'static str] {
        &["name"]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderItem {
    pub id: String,
    pub order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReorderRequest {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub items: Vec<ReorderItem>,
}

pub fn router(app: &SharedState) -> Router {
    let state = ResourceState::<Period>::new(app);

    Router::new()
        .route("/api/period/reorder", put(reorder))
        .with_state(state.clone())
        .merge(resource_router(state))
}

/// Assigns a new display order to several periods at once. Every id is
/// checked before anything is written.
async fn reorder(
    State(rs): State<ResourceState<Period>>,
    auth: AuthUser,
    ctx: RequestContext,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<Record<Period>>>, AppError> {
    if req.items.is_empty() {
        return Err(AppError::BadRequest("Items are required".to_string()));
    }

    let mut pending = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let record = rs.load(&item.id).await?;
        pending.push((record, item.order));
    }

    let mut updated = Vec::with_capacity(pending.len());
    for (record, order) in pending {
        let mut data = record.data;
        data.order = Some(order);
        let saved = rs
            .collection
            .update(record.id, data)
            .await
            .map_err(store_error::<Period>)?
            .ok_or_else(not_found::<Period>)?;
        updated.push(saved);
    }

    let items: Vec<_> = updated
        .iter()
        .map(|r| json!({ "id": r.id, "order": r.data.order }))
        .collect();

    rs.app.activity.record(
        NewActivity::new(
            Actor::from(&auth),
            ActivityType::Update,
            Period::ENTITY_TYPE,
            format!("Reordered {} periods", updated.len()),
        )
        .metadata(json!({ "items": items }))
        .context(&ctx),
    );

    Ok(Json(updated))
}
