use serde::{Deserialize, Serialize};

use super::trimmed;
use crate::db::SortOrder;
use crate::resource::{require, require_if_present, FieldError, Resource, Validate};

/// One seat in the organizational chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub position: String,
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub position: String,
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructurePatch {
    pub position: Option<String>,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub period_id: Option<String>,
    pub order: Option<i32>,
}

impl Validate for StructureDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("position", "Position", &self.position)?;
        require("name", "Name", &self.name)
    }
}

impl Validate for StructurePatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("position", "Position", self.position.as_deref())?;
        require_if_present("name", "Name", self.name.as_deref())
    }
}

impl Resource for Structure {
    const ENTITY_TYPE: &'static str = "Structure";
    const PATH: &'static str = "structure";
    const LABEL: &'static str = "structure";
    const PUBLIC_READ: bool = true;

    type Draft = StructureDraft;
    type Patch = StructurePatch;

    fn from_draft(d: StructureDraft) -> Self {
        Self {
            position: d.position.trim().to_string(),
            name: d.name.trim().to_string(),
            photo_url: trimmed(d.photo_url),
            period_id: trimmed(d.period_id),
            order: d.order,
        }
    }

    fn apply(&mut self, p: StructurePatch) {
        if let Some(position) = p.position {
            self.position = position.trim().to_string();
        }
        if let Some(name) = p.name {
            self.name = name.trim().to_string();
        }
        if p.photo_url.is_some() {
            self.photo_url = trimmed(p.photo_url);
        }
        if p.period_id.is_some() {
            self.period_id = trimmed(p.period_id);
        }
        if p.order.is_some() {
            self.order = p.order;
        }
    }

    fn title(&self) -> String {
        format!("{}: {}", self.position, self.name)
    }

    fn sort_order() -> SortOrder {
        SortOrder::Number("order")
    }

    fn search_fields() -> &'static [&'static str] {
        &["position", "name"]
    }
}
