use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::non_empty;
use crate::db::SortOrder;
use crate::form::FormModel;
use crate::resource::{normalize_key, require, require_if_present, FieldError, Resource, Validate};

/// Static description of one family of simple named categories.
pub trait CategoryKind: 'static {
    const ENTITY_TYPE: &'static str;
    const PATH: &'static str;
    const LABEL: &'static str;
    const PUBLIC_READ: bool;
}

pub struct EventCategoryKind;
pub struct ArticleCategoryKind;
pub struct DocumentTypeKind;

impl CategoryKind for EventCategoryKind {
    const ENTITY_TYPE: &'static str = "EventCategory";
    const PATH: &'static str = "event/category";
    const LABEL: &'static str = "event category";
    const PUBLIC_READ: bool = true;
}

impl CategoryKind for ArticleCategoryKind {
    const ENTITY_TYPE: &'static str = "ArticleCategory";
    const PATH: &'static str = "article/category";
    const LABEL: &'static str = "article category";
    const PUBLIC_READ: bool = true;
}

impl CategoryKind for DocumentTypeKind {
    const ENTITY_TYPE: &'static str = "DocumentType";
    const PATH: &'static str = "document/type";
    const LABEL: &'static str = "document type";
    const PUBLIC_READ: bool = true;
}

pub type EventCategory = Category<EventCategoryKind>;
pub type ArticleCategory = Category<ArticleCategoryKind>;
pub type DocumentType = Category<DocumentTypeKind>;

/// A uniquely named lookup value used to populate dropdowns.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Category<K> {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(skip)]
    kind: PhantomData<fn() -> K>,
}

impl<K> Clone for Category<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            kind: PhantomData,
        }
    }
}

impl<K> std::fmt::Debug for Category<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Category")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Validate for CategoryDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("name", "Name", &self.name)
    }
}

impl Validate for CategoryPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("name", "Name", self.name.as_deref())
    }
}

impl FormModel for CategoryDraft {
    fn set_field(&mut self, field: &str, value: &str) -> bool {
        match field {
            "name" => self.name = value.to_string(),
            "description" => self.description = non_empty(value),
            _ => return false,
        }
        true
    }
}

impl<K: CategoryKind> Resource for Category<K> {
    const ENTITY_TYPE: &'static str = K::ENTITY_TYPE;
    const PATH: &'static str = K::PATH;
    const LABEL: &'static str = K::LABEL;
    const PUBLIC_READ: bool = K::PUBLIC_READ;

    type Draft = CategoryDraft;
    type Patch = CategoryPatch;

    fn from_draft(draft: CategoryDraft) -> Self {
        Self {
            name: draft.name.trim().to_string(),
            description: draft.description.as_deref().and_then(non_empty),
            kind: PhantomData,
        }
    }

    fn apply(&mut self, patch: CategoryPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = non_empty(&description);
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
        &["name", "description"]
    }
}
