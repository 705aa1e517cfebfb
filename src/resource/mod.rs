//! Generic CRUD surface shared by every business entity.
//!
//! An entity implements [`Resource`] once; [`routes::resource_router`] then
//! exposes list/get/create/update/delete under `/api/{PATH}` with
//! validation, access control and activity logging handled uniformly.

pub mod collection;
pub mod handlers;
pub mod routes;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::db::SortOrder;
use crate::error::AppError;

pub use collection::Collection;
pub use handlers::ResourceState;
pub use routes::resource_router;

/// A validation failure tied to one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::BadRequest(err.message)
    }
}

/// Reads an explicit `null` as the field's default so required inputs fail
/// validation with a field message instead of a decode error.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub trait Validate {
    /// Returns the first failing field, if any.
    fn validate(&self) -> Result<(), FieldError>;
}

/// Fails with "`label` is required" when `value` is blank after trimming.
pub fn require(field: &'static str, label: &str, value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, format!("{label} is required")));
    }
    Ok(())
}

/// Like [`require`], but only checks values present in a partial update.
pub fn require_if_present(
    field: &'static str,
    label: &str,
    value: Option<&str>,
) -> Result<(), FieldError> {
    match value {
        Some(v) => require(field, label, v),
        None => Ok(()),
    }
}

pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Tag stored on activity entries, e.g. `"EventCategory"`.
    const ENTITY_TYPE: &'static str;
    /// Route segment under `/api`, e.g. `"event/category"`.
    const PATH: &'static str;
    /// Lowercase human name used in messages.
    const LABEL: &'static str;
    /// Whether list/get skip authentication unless configuration overrides it.
    const PUBLIC_READ: bool = false;
    /// Field named in conflict messages.
    const UNIQUE_FIELD: &'static str = "name";

    type Draft: Serialize + DeserializeOwned + Validate + Send + 'static;
    type Patch: Serialize + DeserializeOwned + Validate + Send + 'static;

    fn from_draft(draft: Self::Draft) -> Self;

    fn apply(&mut self, patch: Self::Patch);

    /// Cross-field rules on the complete record, run after a patch is merged.
    fn check(&self) -> Result<(), FieldError> {
        Ok(())
    }

    /// Short display value used in activity descriptions.
    fn title(&self) -> String;

    /// Normalized value that must be unique among records of this type.
    fn unique_key(&self) -> Option<String> {
        None
    }

    fn sort_order() -> SortOrder {
        SortOrder::Newest
    }

    fn search_fields() -> &'static [&'static str] {
        &[]
    }
}

/// A persisted resource: server-assigned fields around the domain data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    pub id: Uuid,
    #[serde(flatten)]
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub period_id: Option<String>,
    pub category_id: Option<String>,
    pub type_id: Option<String>,
}

pub(crate) fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercased, whitespace-collapsed form used for uniqueness checks.
pub fn normalize_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(value.trim()))
}

pub fn require_email(field: &'static str, value: &str) -> Result<(), FieldError> {
    require(field, "Email", value)?;
    if !is_valid_email(value) {
        return Err(FieldError::new(field, "Email is invalid"));
    }
    Ok(())
}
