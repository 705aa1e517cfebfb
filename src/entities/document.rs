use serde::{Deserialize, Serialize};

use super::trimmed;
use crate::resource::{require, require_if_present, FieldError, Resource, Validate};

/// An archived file reference, typed by a [`super::DocumentType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub type_id: Option<String>,
    pub period_id: Option<String>,
}

impl Validate for DocumentDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("title", "Title", &self.title)
    }
}

impl Validate for DocumentPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("title", "Title", self.title.as_deref())
    }
}

impl Resource for Document {
    const ENTITY_TYPE: &'static str = "Document";
    const PATH: &'static str = "document";
    const LABEL: &'static str = "document";

    type Draft = DocumentDraft;
    type Patch = DocumentPatch;

    fn from_draft(d: DocumentDraft) -> Self {
        Self {
            title: d.title.trim().to_string(),
            description: trimmed(d.description),
            file_url: trimmed(d.file_url),
            type_id: trimmed(d.type_id),
            period_id: trimmed(d.period_id),
        }
    }

    fn apply(&mut self, p: DocumentPatch) {
        if let Some(title) = p.title {
            self.title = title.trim().to_string();
        }
        if p.description.is_some() {
            self.description = trimmed(p.description);
        }
        if p.file_url.is_some() {
            self.file_url = trimmed(p.file_url);
        }
        if p.type_id.is_some() {
            self.type_id = trimmed(p.type_id);
        }
        if p.period_id.is_some() {
            self.period_id = trimmed(p.period_id);
        }
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn search_fields() -> &'static [&'static str] {
        &["title", "description"]
    }
}
