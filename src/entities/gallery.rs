use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::trimmed;
use crate::resource::{require, require_if_present, FieldError, Resource, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub date: Option<NaiveDate>,
    pub event_id: Option<String>,
}

impl Validate for GalleryDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("title", "Title", &self.title)
    }
}

impl Validate for GalleryPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("title", "Title", self.title.as_deref())
    }
}

fn clean_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

impl Resource for Gallery {
    const ENTITY_TYPE: &'static str = "Gallery";
    const PATH: &'static str = "gallery";
    const LABEL: &'static str = "gallery";
    const PUBLIC_READ: bool = true;

    type Draft = GalleryDraft;
    type Patch = GalleryPatch;

    fn from_draft(d: GalleryDraft) -> Self {
        Self {
            title: d.title.trim().to_string(),
            description: trimmed(d.description),
            image_urls: clean_urls(d.image_urls),
            date: d.date,
            event_id: trimmed(d.event_id),
        }
    }

    fn apply(&mut self, p: GalleryPatch) {
        if let Some(title) = p.title {
            self.title = title.trim().to_string();
        }
        if p.description.is_some() {
            self.description = trimmed(p.description);
        }
        if let Some(urls) = p.image_urls {
            self.image_urls = clean_urls(urls);
        }
        if p.date.is_some() {
            self.date = p.date;
        }
        if p.event_id.is_some() {
            self.event_id = trimmed(p.event_id);
        }
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn search_fields() -> &'static [&'static str] {
        &["title", "description"]
    }
}
