use axum::extract::{Path, State};
use axum::routing::post;
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{check_one_of, trimmed};
use crate::activity::RequestContext;
use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::extract::Json;
use crate::models::ActivityType;
use crate::resource::handlers::{not_found, snapshot, store_error};
use crate::resource::{
    normalize_key, require, require_if_present, resource_router, FieldError, Record, Resource,
    ResourceState, Validate,
};
use crate::state::SharedState;

pub const LETTER_TYPES: &[&str] = &["incoming", "outgoing"];
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_VERIFIED: &str = "verified";

/// Official correspondence, identified by its registry number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Letter {
    pub number: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub file_url: Option<String>,
    pub status: String,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verified_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub number: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub subject: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Status is only changed through verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterPatch {
    pub number: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub date: Option<NaiveDate>,
    pub file_url: Option<String>,
}

impl Validate for LetterDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("subject", "Subject", &self.subject)?;
        require("number", "Number", &self.number)?;
        check_one_of("type", "Type", self.kind.as_deref(), LETTER_TYPES)
    }
}

impl Validate for LetterPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("subject", "Subject", self.subject.as_deref())?;
        require_if_present("number", "Number", self.number.as_deref())?;
        check_one_of("type", "Type", self.kind.as_deref(), LETTER_TYPES)
    }
}

impl Resource for Letter {
    const ENTITY_TYPE: &'static str = "Letter";
    const PATH: &'static str = "letter";
    const LABEL: &'static str = "letter";
    const UNIQUE_FIELD: &'static str = "number";

    type Draft = LetterDraft;
    type Patch = LetterPatch;

    fn from_draft(d: LetterDraft) -> Self {
        Self {
            number: d.number.trim().to_string(),
            subject: d.subject.trim().to_string(),
            kind: d.kind.unwrap_or_else(|| "incoming".to_string()),
            sender: trimmed(d.sender),
            recipient: trimmed(d.recipient),
            date: d.date,
            file_url: trimmed(d.file_url),
            status: STATUS_PENDING.to_string(),
            verified_at: None,
            verified_by: None,
        }
    }

    fn apply(&mut self, p: LetterPatch) {
        if let Some(number) = p.number {
            self.number = number.trim().to_string();
        }
        if let Some(subject) = p.subject {
            self.subject = subject.trim().to_string();
        }
        if let Some(kind) = p.kind {
            self.kind = kind;
        }
        if p.sender.is_some() {
            self.sender = trimmed(p.sender);
        }
        if p.recipient.is_some() {
            self.recipient = trimmed(p.recipient);
        }
        if p.date.is_some() {
            self.date = p.date;
        }
        if p.file_url.is_some() {
            self.file_url = trimmed(p.file_url);
        }
    }

    fn title(&self) -> String {
        format!("{} - {}", self.number, self.subject)
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.number))
    }

    fn search_fields() -> &'static [&'static str] {
        &["number", "subject", "sender", "recipient"]
    }
}

pub fn router(app: &SharedState) -> Router {
    let state = ResourceState::<Letter>::new(app);

    Router::new()
        .route("/api/letter/{id}/verify", post(verify))
        .with_state(state.clone())
        .merge(resource_router(state))
}

async fn verify(
    State(rs): State<ResourceState<Letter>>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<Record<Letter>>, AppError> {
    let existing = rs.load(&id).await?;
    if existing.data.status == STATUS_VERIFIED {
        return Err(AppError::Conflict("Letter is already verified".to_string()));
    }

    let mut data = existing.data.clone();
    data.status = STATUS_VERIFIED.to_string();
    data.verified_at = Some(Utc::now());
    data.verified_by = Some(auth.user_id);

    let verified = rs
        .collection
        .update(existing.id, data)
        .await
        .map_err(store_error::<Letter>)?
        .ok_or_else(not_found::<Letter>)?;

    rs.log(
        &auth,
        &ctx,
        ActivityType::Verify,
        verified.id,
        format!("Verified letter: {}", verified.data.title()),
        json!({ "oldData": snapshot(&existing), "newData": snapshot(&verified) }),
    );

    Ok(Json(verified))
}
