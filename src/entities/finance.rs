use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{check_one_of, non_empty, trimmed};
use crate::auth::extractor::AuthUser;
use crate::db::SortOrder;
use crate::error::AppError;
use crate::extract::{Json, Query};
use crate::form::FormModel;
use crate::resource::{
    normalize_key, require, require_if_present, resource_router, FieldError, ListQuery, Resource,
    ResourceState, Validate,
};
use crate::state::SharedState;

pub const INCOME: &str = "income";
pub const EXPENSE: &str = "expense";
pub const FINANCE_TYPES: &[&str] = &[INCOME, EXPENSE];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceCategoryDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceCategoryPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

impl Validate for FinanceCategoryDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("name", "Name", &self.name)?;
        check_one_of("type", "Type", self.kind.as_deref(), FINANCE_TYPES)
    }
}

impl Validate for FinanceCategoryPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("name", "Name", self.name.as_deref())?;
        check_one_of("type", "Type", self.kind.as_deref(), FINANCE_TYPES)
    }
}

impl Resource for FinanceCategory {
    const ENTITY_TYPE: &'static str = "FinanceCategory";
    const PATH: &'static str = "finance/category";
    const LABEL: &'static str = "finance category";

    type Draft = FinanceCategoryDraft;
    type Patch = FinanceCategoryPatch;

    fn from_draft(d: FinanceCategoryDraft) -> Self {
        Self {
            name: d.name.trim().to_string(),
            kind: d.kind.unwrap_or_else(|| EXPENSE.to_string()),
            description: trimmed(d.description),
        }
    }

    fn apply(&mut self, p: FinanceCategoryPatch) {
        if let Some(name) = p.name {
            self.name = name.trim().to_string();
        }
        if let Some(kind) = p.kind {
            self.kind = kind;
        }
        if p.description.is_some() {
            self.description = trimmed(p.description);
        }
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.name))
    }

    fn sort_order() -> SortOrder {
        SortOrder::Text("name")
    }

    fn search_fields() -> &'static [&'static str] {
        &["name"]
    }
}

/// A single income or expense transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finance {
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub amount: f64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancePatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub date: Option<NaiveDate>,
    pub category_id: Option<String>,
    pub period_id: Option<String>,
}

fn check_amount(amount: f64) -> Result<(), FieldError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(FieldError::new("amount", "Amount must be greater than zero"));
    }
    Ok(())
}

impl Validate for FinanceDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("description", "Description", &self.description)?;
        check_amount(self.amount)?;
        require("type", "Type", &self.kind)?;
        check_one_of("type", "Type", Some(self.kind.as_str()), FINANCE_TYPES)
    }
}

impl Validate for FinancePatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("description", "Description", self.description.as_deref())?;
        if let Some(amount) = self.amount {
            check_amount(amount)?;
        }
        check_one_of("type", "Type", self.kind.as_deref(), FINANCE_TYPES)
    }
}

impl FormModel for FinanceDraft {
    fn set_field(&mut self, field: &str, value: &str) -> bool {
        match field {
            "description" => self.description = value.to_string(),
            "amount" => self.amount = value.trim().parse().unwrap_or(0.0),
            "type" => self.kind = value.trim().to_string(),
            "date" => self.date = super::parse_date(value),
            "categoryId" => self.category_id = non_empty(value),
            "periodId" => self.period_id = non_empty(value),
            _ => return false,
        }
        true
    }
}

impl Resource for Finance {
    const ENTITY_TYPE: &'static str = "Finance";
    const PATH: &'static str = "finance";
    const LABEL: &'static str = "finance record";

    type Draft = FinanceDraft;
    type Patch = FinancePatch;

    fn from_draft(d: FinanceDraft) -> Self {
        Self {
            description: d.description.trim().to_string(),
            amount: d.amount,
            kind: d.kind,
            date: d.date,
            category_id: trimmed(d.category_id),
            period_id: trimmed(d.period_id),
        }
    }

    fn apply(&mut self, p: FinancePatch) {
        if let Some(description) = p.description {
            self.description = description.trim().to_string();
        }
        if let Some(amount) = p.amount {
            self.amount = amount;
        }
        if let Some(kind) = p.kind {
            self.kind = kind;
        }
        if p.date.is_some() {
            self.date = p.date;
        }
        if p.category_id.is_some() {
            self.category_id = trimmed(p.category_id);
        }
        if p.period_id.is_some() {
            self.period_id = trimmed(p.period_id);
        }
    }

    fn title(&self) -> String {
        format!("{} ({} {:.2})", self.description, self.kind, self.amount)
    }

    fn search_fields() -> &'static [&'static str] {
        &["description"]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    /// Number of transactions per type.
    pub by_type: BTreeMap<String, i64>,
}

pub fn router(app: &SharedState) -> Router {
    let state = ResourceState::<Finance>::new(app);

    Router::new()
        .route("/api/finance/summary", get(summary))
        .with_state(state.clone())
        .merge(resource_router(state))
        .merge(resource_router(ResourceState::<FinanceCategory>::new(app)))
}

async fn summary(
    State(rs): State<ResourceState<Finance>>,
    _auth: AuthUser,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<FinanceSummary>, AppError> {
    let filter = ListQuery {
        period_id: query.period_id,
        ..ListQuery::default()
    };

    let records = rs.collection.find(&filter).await?;
    let by_type = rs.collection.group_by("type", &filter).await?;

    let (mut income, mut expense) = (0.0, 0.0);
    for record in &records {
        match record.data.kind.as_str() {
            INCOME => income += record.data.amount,
            EXPENSE => expense += record.data.amount,
            other => tracing::warn!(id = %record.id, "Skipping finance record with type '{other}'"),
        }
    }

    Ok(Json(FinanceSummary {
        income,
        expense,
        balance: income - expense,
        by_type,
    }))
}
