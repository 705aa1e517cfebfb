//! Business objects of the portal. Each one is a [`Resource`] instantiation;
//! a few carry extra endpoints next to the generic CRUD surface.

pub mod article;
pub mod category;
pub mod contact;
pub mod document;
pub mod event;
pub mod finance;
pub mod gallery;
pub mod letter;
pub mod period;
pub mod structure;
pub mod work_program;

use std::collections::BTreeMap;

use axum::Router;
use chrono::NaiveDate;

use crate::db::StoreError;
use crate::resource::{resource_router, Collection, FieldError, ListQuery, Resource, ResourceState};
use crate::state::SharedState;

pub use article::Article;
pub use category::{ArticleCategory, DocumentType, EventCategory};
pub use contact::ContactMessage;
pub use document::Document;
pub use event::Event;
pub use finance::{Finance, FinanceCategory};
pub use gallery::Gallery;
pub use letter::Letter;
pub use period::Period;
pub use structure::Structure;
pub use work_program::WorkProgram;

/// Every entity router, ready to be merged into the API.
pub fn routes(app: &SharedState) -> Router {
    Router::new()
        .merge(period::router(app))
        .merge(resource_router(ResourceState::<EventCategory>::new(app)))
        .merge(resource_router(ResourceState::<Event>::new(app)))
        .merge(resource_router(ResourceState::<ArticleCategory>::new(app)))
        .merge(resource_router(ResourceState::<Article>::new(app)))
        .merge(resource_router(ResourceState::<DocumentType>::new(app)))
        .merge(resource_router(ResourceState::<Document>::new(app)))
        .merge(finance::router(app))
        .merge(letter::router(app))
        .merge(resource_router(ResourceState::<Gallery>::new(app)))
        .merge(resource_router(ResourceState::<WorkProgram>::new(app)))
        .merge(resource_router(ResourceState::<Structure>::new(app)))
        .merge(contact::router(app))
}

async fn count<R: Resource>(app: &SharedState) -> Result<(&'static str, i64), StoreError> {
    let total = Collection::<R>::new(app.documents.clone())
        .count(&ListQuery::default())
        .await?;
    Ok((R::ENTITY_TYPE, total))
}

/// Record totals keyed by entity type.
pub async fn counts(app: &SharedState) -> Result<BTreeMap<&'static str, i64>, StoreError> {
    Ok(BTreeMap::from([
        count::<Period>(app).await?,
        count::<EventCategory>(app).await?,
        count::<Event>(app).await?,
        count::<ArticleCategory>(app).await?,
        count::<Article>(app).await?,
        count::<DocumentType>(app).await?,
        count::<Document>(app).await?,
        count::<FinanceCategory>(app).await?,
        count::<Finance>(app).await?,
        count::<Letter>(app).await?,
        count::<Gallery>(app).await?,
        count::<WorkProgram>(app).await?,
        count::<Structure>(app).await?,
        count::<ContactMessage>(app).await?,
    ]))
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(non_empty)
}

/// Form inputs use `YYYY-MM-DD`; anything else clears the date.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub(crate) fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), FieldError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(FieldError::new(
            "endDate",
            "End date must not be before start date",
        )),
        _ => Ok(()),
    }
}

pub(crate) fn check_one_of(
    field: &'static str,
    label: &str,
    value: Option<&str>,
    allowed: &[&str],
) -> Result<(), FieldError> {
    match value {
        Some(v) if !allowed.contains(&v) => Err(FieldError::new(
            field,
            format!("{label} must be one of: {}", allowed.join(", ")),
        )),
        _ => Ok(()),
    }
}
