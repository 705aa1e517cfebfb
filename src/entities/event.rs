use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{check_date_range, non_empty, parse_date, trimmed};
use crate::form::FormModel;
use crate::resource::{require, require_if_present, FieldError, Resource, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub category_id: Option<String>,
    pub period_id: Option<String>,
}

impl Validate for EventDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("title", "Title", &self.title)?;
        check_date_range(self.start_date, self.end_date)
    }
}

impl Validate for EventPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("title", "Title", self.title.as_deref())?;
        check_date_range(self.start_date, self.end_date)
    }
}

impl FormModel for EventDraft {
    fn set_field(&mut self, field: &str, value: &str) -> bool {
        match field {
            "title" => self.title = value.to_string(),
            "description" => self.description = non_empty(value),
            "location" => self.location = non_empty(value),
            "startDate" => self.start_date = parse_date(value),
            "endDate" => self.end_date = parse_date(value),
            "imageUrl" => self.image_url = non_empty(value),
            "categoryId" => self.category_id = non_empty(value),
            "periodId" => self.period_id = non_empty(value),
            _ => return false,
        }
        true
    }
}

impl Resource for Event {
    const ENTITY_TYPE: &'static str = "Event";
    const PATH: &'static str = "event";
    const LABEL: &'static str = "event";
    const PUBLIC_READ: bool = true;

    type Draft = EventDraft;
    type Patch = EventPatch;

    fn from_draft(d: EventDraft) -> Self {
        Self {
            title: d.title.trim().to_string(),
            description: trimmed(d.description),
            location: trimmed(d.location),
            start_date: d.start_date,
            end_date: d.end_date,
            image_url: trimmed(d.image_url),
            category_id: trimmed(d.category_id),
            period_id: trimmed(d.period_id),
        }
    }

    fn apply(&mut self, p: EventPatch) {
        if let Some(title) = p.title {
            self.title = title.trim().to_string();
        }
        if p.description.is_some() {
            self.description = trimmed(p.description);
        }
        if p.location.is_some() {
            self.location = trimmed(p.location);
        }
        if p.start_date.is_some() {
            self.start_date = p.start_date;
        }
        if p.end_date.is_some() {
            self.end_date = p.end_date;
        }
        if p.image_url.is_some() {
            self.image_url = trimmed(p.image_url);
        }
        if p.category_id.is_some() {
            self.category_id = trimmed(p.category_id);
        }
        if p.period_id.is_some() {
            self.period_id = trimmed(p.period_id);
        }
    }

    fn check(&self) -> Result<(), FieldError> {
        check_date_range(self.start_date, self.end_date)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn search_fields() -> &'static [&'static str] {
        &["title", "description", "location"]
    }
}
