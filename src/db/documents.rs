use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::StoreError;

/// A resource row as the persistence layer sees it: domain fields live in
/// `data`, keyed by entity type.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredDocument {
    pub id: Uuid,
    pub entity_type: String,
    pub unique_key: Option<String>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Normalized value that must be unique within the entity type.
    pub unique_key: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created first.
    Newest,
    /// Case-insensitive ascending by a text field.
    Text(&'static str),
    /// Ascending by a numeric field; rows without it go last.
    Number(&'static str),
}

#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub search: Option<String>,
    pub search_fields: &'static [&'static str],
    /// Exact matches on top-level fields of `data`.
    pub equals: Vec<(&'static str, String)>,
    pub sort: SortOrder,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            search: None,
            search_fields: &[],
            equals: Vec::new(),
            sort: SortOrder::Newest,
            limit: None,
            offset: 0,
        }
    }
}

impl DocumentQuery {
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !self.search_fields.is_empty())
    }

    pub fn with_equals(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.equals.push((field, value.into()));
        self
    }
}

/// Persistence collaborator for resource documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        entity_type: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    async fn find_by_id(
        &self,
        entity_type: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError>;

    async fn create(&self, entity_type: &str, doc: NewDocument)
    -> Result<StoredDocument, StoreError>;

    /// Replaces the data of an existing document. `None` when the id is unknown.
    async fn update(
        &self,
        entity_type: &str,
        id: Uuid,
        doc: NewDocument,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, entity_type: &str, id: Uuid) -> Result<bool, StoreError>;

    async fn count(&self, entity_type: &str, query: &DocumentQuery) -> Result<i64, StoreError>;

    /// Counts documents per distinct value of `field`. Missing values group under "".
    async fn group_by(
        &self,
        entity_type: &str,
        field: &str,
        query: &DocumentQuery,
    ) -> Result<BTreeMap<String, i64>, StoreError>;
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(
        &self,
        entity_type: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM resources");
        push_filters(&mut qb, entity_type, query);

        match query.sort {
            SortOrder::Newest => {
                qb.push(" ORDER BY created_at DESC, id DESC");
            }
            SortOrder::Text(field) => {
                qb.push(" ORDER BY lower(data ->> ");
                qb.push_bind(field.to_string());
                qb.push(") ASC, created_at DESC");
            }
            SortOrder::Number(field) => {
                qb.push(" ORDER BY (data ->> ");
                qb.push_bind(field.to_string());
                qb.push(")::numeric ASC NULLS LAST, created_at ASC");
            }
        }

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        if query.offset > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(query.offset);
        }

        let rows = qb
            .build_query_as::<StoredDocument>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_id(
        &self,
        entity_type: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query_as::<_, StoredDocument>(
            "SELECT * FROM resources WHERE id = $1 AND entity_type = $2",
        )
        .bind(id)
        .bind(entity_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create(
        &self,
        entity_type: &str,
        doc: NewDocument,
    ) -> Result<StoredDocument, StoreError> {
        let row = sqlx::query_as::<_, StoredDocument>(
            "INSERT INTO resources (id, entity_type, unique_key, data)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(entity_type)
        .bind(doc.unique_key)
        .bind(doc.data)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        entity_type: &str,
        id: Uuid,
        doc: NewDocument,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query_as::<_, StoredDocument>(
            "UPDATE resources SET unique_key = $3, data = $4, updated_at = now()
             WHERE id = $1 AND entity_type = $2 RETURNING *",
        )
        .bind(id)
        .bind(entity_type)
        .bind(doc.unique_key)
        .bind(doc.data)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, entity_type: &str, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1 AND entity_type = $2")
            .bind(id)
            .bind(entity_type)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, entity_type: &str, query: &DocumentQuery) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM resources");
        push_filters(&mut qb, entity_type, query);
        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn group_by(
        &self,
        entity_type: &str,
        field: &str,
        query: &DocumentQuery,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COALESCE(data ->> ");
        qb.push_bind(field.to_string());
        qb.push(", '') AS key, COUNT(*) AS total FROM resources");
        push_filters(&mut qb, entity_type, query);
        qb.push(" GROUP BY 1");

        let rows = qb
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, entity_type: &str, query: &DocumentQuery) {
    qb.push(" WHERE entity_type = ");
    qb.push_bind(entity_type.to_string());

    for (field, value) in &query.equals {
        qb.push(" AND data ->> ");
        qb.push_bind(field.to_string());
        qb.push(" = ");
        qb.push_bind(value.clone());
    }

    if let Some(search) = query.search_term() {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (");
        for (i, field) in query.search_fields.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("data ->> ");
            qb.push_bind(field.to_string());
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
