use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::StoreError;
use crate::models::{ActivityLogEntry, ActivityQuery, ActivityType, NewActivity};

/// Append-only storage for activity log entries.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn append(&self, entry: NewActivity) -> Result<(), StoreError>;
    async fn list(&self, query: &ActivityQuery) -> Result<Vec<ActivityLogEntry>, StoreError>;
}

pub struct PgActivityStore {
    pool: PgPool,
}

impl PgActivityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    user_id: Option<Uuid>,
    activity_type: String,
    entity_type: String,
    entity_id: Option<Uuid>,
    description: String,
    metadata: Option<serde_json::Value>,
    ip_address: String,
    user_agent: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for ActivityLogEntry {
    type Error = StoreError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let activity_type = ActivityType::parse(&row.activity_type).ok_or_else(|| {
            StoreError::Decode(format!("unknown activity type '{}'", row.activity_type))
        })?;
        Ok(ActivityLogEntry {
            id: row.id,
            user_id: row.user_id,
            activity_type,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            description: row.description,
            metadata: row.metadata,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ActivitySink for PgActivityStore {
    async fn append(&self, entry: NewActivity) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO activity_logs
                (id, user_id, activity_type, entity_type, entity_id, description, metadata, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(Uuid::now_v7())
        .bind(entry.user_id)
        .bind(entry.activity_type.as_str())
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.description)
        .bind(entry.metadata)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, query: &ActivityQuery) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT * FROM activity_logs
             WHERE ($1::text IS NULL OR entity_type = $1)
               AND ($2::uuid IS NULL OR user_id = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(query.entity_type.as_deref())
        .bind(query.user_id)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ActivityLogEntry::try_from).collect()
    }
}
