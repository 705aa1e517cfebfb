use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{non_empty, trimmed};
use crate::activity::{Actor, ClientAddr, RequestContext};
use crate::email::templates::ContactNotification;
use crate::error::AppError;
use crate::extract::Json;
use crate::form::FormModel;
use crate::models::{ActivityType, NewActivity};
use crate::resource::handlers::{snapshot, store_error};
use crate::resource::{
    require, require_email, require_if_present, resource_router, FieldError, Record, Resource,
    ResourceState, Validate,
};
use crate::state::SharedState;

/// A message left through the public contact form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub is_read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub message: String,
}

/// Back-office edits are limited to triage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
    pub subject: Option<String>,
    pub is_read: Option<bool>,
}

impl Validate for ContactDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("name", "Name", &self.name)?;
        require_email("email", &self.email)?;
        require("message", "Message", &self.message)
    }
}

impl Validate for ContactPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("subject", "Subject", self.subject.as_deref())
    }
}

impl FormModel for ContactDraft {
    fn set_field(&mut self, field: &str, value: &str) -> bool {
        match field {
            "name" => self.name = value.to_string(),
            "email" => self.email = value.to_string(),
            "subject" => self.subject = non_empty(value),
            "message" => self.message = value.to_string(),
            _ => return false,
        }
        true
    }
}

impl Resource for ContactMessage {
    const ENTITY_TYPE: &'static str = "ContactMessage";
    const PATH: &'static str = "contact";
    const LABEL: &'static str = "contact message";

    type Draft = ContactDraft;
    type Patch = ContactPatch;

    fn from_draft(d: ContactDraft) -> Self {
        Self {
            name: d.name.trim().to_string(),
            email: d.email.trim().to_lowercase(),
            subject: trimmed(d.subject),
            message: d.message.trim().to_string(),
            is_read: false,
        }
    }

    fn apply(&mut self, p: ContactPatch) {
        if p.subject.is_some() {
            self.subject = trimmed(p.subject);
        }
        if let Some(is_read) = p.is_read {
            self.is_read = is_read;
        }
    }

    fn title(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    fn search_fields() -> &'static [&'static str] {
        &["name", "email", "subject", "message"]
    }
}

pub fn router(app: &SharedState) -> Router {
    let state = ResourceState::<ContactMessage>::new(app);

    Router::new()
        .route("/api/contact/submit", post(submit))
        .with_state(state.clone())
        .merge(resource_router(state))
}

/// Public entry point. Anonymous submissions are attributed to the system actor.
async fn submit(
    State(rs): State<ResourceState<ContactMessage>>,
    ClientAddr(client): ClientAddr,
    ctx: RequestContext,
    Json(draft): Json<ContactDraft>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if rs.app.contact_limiter.check(&client.to_string()).is_err() {
        return Err(AppError::RateLimited(
            "Too many messages. Please try again later.".to_string(),
        ));
    }

    draft.validate()?;

    let record = rs
        .collection
        .create(ContactMessage::from_draft(draft))
        .await
        .map_err(store_error::<ContactMessage>)?;

    rs.app.activity.record(
        NewActivity::new(
            Actor::parse(Actor::SYSTEM_SENTINEL),
            ActivityType::Create,
            ContactMessage::ENTITY_TYPE,
            format!("New contact message from {}", record.data.title()),
        )
        .entity_id(record.id)
        .metadata(json!({ "newData": snapshot(&record) }))
        .context(&ctx),
    );

    notify(&rs.app, &record);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": record.id, "message": "Message sent" })),
    ))
}

fn notify(app: &SharedState, record: &Record<ContactMessage>) {
    let Some(mailer) = app.system_mailer.clone() else {
        tracing::warn!(id = %record.id, "System SMTP not configured, contact message not emailed");
        return;
    };
    let recipient = app.config.contact_recipient.clone();
    let admin_url = format!("{}/admin/contact/{}", app.config.base_url, record.id);
    let msg = record.data.clone();

    tokio::spawn(async move {
        if let Some(to) = recipient {
            let notification = ContactNotification {
                name: &msg.name,
                email: &msg.email,
                subject: msg.subject.as_deref(),
                message: &msg.message,
                admin_url: &admin_url,
            };
            if let Err(e) = mailer.send_contact_notification(&to, &notification).await {
                tracing::error!("Failed to send contact notification: {e}");
            }
        }
        if let Err(e) = mailer.send_contact_receipt(&msg.email, &msg.name).await {
            tracing::error!("Failed to send contact receipt: {e}");
        }
    });
}
