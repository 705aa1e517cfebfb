use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_one_of, trimmed};
use crate::resource::{require, require_if_present, FieldError, Resource, Validate};

pub const ARTICLE_STATUSES: &[&str] = &["draft", "published"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    pub status: String,
    /// Set the first time the article is published.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<String>,
    pub status: Option<String>,
}

impl Validate for ArticleDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("title", "Title", &self.title)?;
        check_one_of("status", "Status", self.status.as_deref(), ARTICLE_STATUSES)
    }
}

impl Validate for ArticlePatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("title", "Title", self.title.as_deref())?;
        check_one_of("status", "Status", self.status.as_deref(), ARTICLE_STATUSES)
    }
}

impl Article {
    fn set_status(&mut self, status: String) {
        if status == "published" && self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
        self.status = status;
    }
}

impl Resource for Article {
    const ENTITY_TYPE: &'static str = "Article";
    const PATH: &'static str = "article";
    const LABEL: &'static str = "article";
    const PUBLIC_READ: bool = true;

    type Draft = ArticleDraft;
    type Patch = ArticlePatch;

    fn from_draft(d: ArticleDraft) -> Self {
        let mut article = Self {
            title: d.title.trim().to_string(),
            content: trimmed(d.content),
            excerpt: trimmed(d.excerpt),
            image_url: trimmed(d.image_url),
            category_id: trimmed(d.category_id),
            status: "draft".to_string(),
            published_at: None,
        };
        if let Some(status) = d.status {
            article.set_status(status);
        }
        article
    }

    fn apply(&mut self, p: ArticlePatch) {
        if let Some(title) = p.title {
            self.title = title.trim().to_string();
        }
        if p.content.is_some() {
            self.content = trimmed(p.content);
        }
        if p.excerpt.is_some() {
            self.excerpt = trimmed(p.excerpt);
        }
        if p.image_url.is_some() {
            self.image_url = trimmed(p.image_url);
        }
        if p.category_id.is_some() {
            self.category_id = trimmed(p.category_id);
        }
        if let Some(status) = p.status {
            self.set_status(status);
        }
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn search_fields() -> &'static [&'static str] {
        &["title", "excerpt", "content"]
    }
}
