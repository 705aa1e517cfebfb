//! In-process stores with the same observable behavior as the Postgres ones.
//! Used by the test suite and when the server runs without `DATABASE_URL`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ActivitySink, DocumentQuery, DocumentStore, NewDocument, SortOrder, StoreError,
    StoredDocument, UserStore,
};
use crate::models::{ActivityLogEntry, ActivityQuery, NewActivity, NewUser, User, UserChanges};

#[derive(Default)]
pub struct MemoryDatabase {
    pub documents: Arc<MemoryDocumentStore>,
    pub users: Arc<MemoryUserStore>,
    pub activity: Arc<MemoryActivityStore>,
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    rows: RwLock<HashMap<Uuid, StoredDocument>>,
}

fn field_text(data: &Value, field: &str) -> Option<String> {
    match data.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(doc: &StoredDocument, entity_type: &str, query: &DocumentQuery) -> bool {
    if doc.entity_type != entity_type {
        return false;
    }

    let equals_ok = query
        .equals
        .iter()
        .all(|(field, value)| field_text(&doc.data, field).as_deref() == Some(value.as_str()));
    if !equals_ok {
        return false;
    }

    match query.search_term() {
        Some(term) => {
            let term = term.to_lowercase();
            query.search_fields.iter().any(|field| {
                field_text(&doc.data, field)
                    .map(|v| v.to_lowercase().contains(&term))
                    .unwrap_or(false)
            })
        }
        None => true,
    }
}

fn compare(a: &StoredDocument, b: &StoredDocument, sort: SortOrder) -> Ordering {
    match sort {
        SortOrder::Newest => b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)),
        SortOrder::Text(field) => {
            let left = field_text(&a.data, field).map(|s| s.to_lowercase());
            let right = field_text(&b.data, field).map(|s| s.to_lowercase());
            left.cmp(&right).then_with(|| b.created_at.cmp(&a.created_at))
        }
        SortOrder::Number(field) => {
            let left = a.data.get(field).and_then(Value::as_f64);
            let right = b.data.get(field).and_then(Value::as_f64);
            let by_value = match (left, right) {
                (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_value.then_with(|| a.created_at.cmp(&b.created_at))
        }
    }
}

fn ensure_unique(
    rows: &HashMap<Uuid, StoredDocument>,
    entity_type: &str,
    unique_key: Option<&str>,
    except: Option<Uuid>,
) -> Result<(), StoreError> {
    let Some(key) = unique_key else {
        return Ok(());
    };
    let taken = rows.values().any(|row| {
        row.entity_type == entity_type
            && row.unique_key.as_deref() == Some(key)
            && Some(row.id) != except
    });
    if taken {
        return Err(StoreError::Conflict(format!(
            "{entity_type} with key '{key}' already exists"
        )));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(
        &self,
        entity_type: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let rows = self.rows.read().await;
        let mut found: Vec<StoredDocument> = rows
            .values()
            .filter(|doc| matches(doc, entity_type, query))
            .cloned()
            .collect();
        found.sort_by(|a, b| compare(a, b, query.sort));

        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = query
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        Ok(found.into_iter().skip(offset).take(limit).collect())
    }

    async fn find_by_id(
        &self,
        entity_type: &str,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&id)
            .filter(|doc| doc.entity_type == entity_type)
            .cloned())
    }

    async fn create(
        &self,
        entity_type: &str,
        doc: NewDocument,
    ) -> Result<StoredDocument, StoreError> {
        let mut rows = self.rows.write().await;
        ensure_unique(&rows, entity_type, doc.unique_key.as_deref(), None)?;

        let now = Utc::now();
        let stored = StoredDocument {
            id: Uuid::now_v7(),
            entity_type: entity_type.to_string(),
            unique_key: doc.unique_key,
            data: doc.data,
            created_at: now,
            updated_at: now,
        };
        rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        entity_type: &str,
        id: Uuid,
        doc: NewDocument,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let mut rows = self.rows.write().await;
        let exists = rows
            .get(&id)
            .is_some_and(|row| row.entity_type == entity_type);
        if !exists {
            return Ok(None);
        }
        ensure_unique(&rows, entity_type, doc.unique_key.as_deref(), Some(id))?;

        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        row.unique_key = doc.unique_key;
        row.data = doc.data;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, entity_type: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        let exists = rows
            .get(&id)
            .is_some_and(|row| row.entity_type == entity_type);
        if exists {
            rows.remove(&id);
        }
        Ok(exists)
    }

    async fn count(&self, entity_type: &str, query: &DocumentQuery) -> Result<i64, StoreError> {
        let rows = self.rows.read().await;
        let total = rows
            .values()
            .filter(|doc| matches(doc, entity_type, query))
            .count();
        Ok(i64::try_from(total).unwrap_or(i64::MAX))
    }

    async fn group_by(
        &self,
        entity_type: &str,
        field: &str,
        query: &DocumentQuery,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        let rows = self.rows.read().await;
        let mut groups = BTreeMap::new();
        for doc in rows.values().filter(|doc| matches(doc, entity_type, query)) {
            let key = field_text(&doc.data, field).unwrap_or_default();
            *groups.entry(key).or_insert(0) += 1;
        }
        Ok(groups)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, None) {
            return Err(StoreError::Conflict(format!(
                "user with email '{}' already exists",
                user.email
            )));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::now_v7(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if let Some(email) = changes.email.as_deref() {
            if email_taken(&users, email, Some(id)) {
                return Err(StoreError::Conflict(format!(
                    "user with email '{email}' already exists"
                )));
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let total = self.users.read().await.len();
        Ok(i64::try_from(total).unwrap_or(i64::MAX))
    }
}

#[derive(Default)]
pub struct MemoryActivityStore {
    entries: RwLock<Vec<ActivityLogEntry>>,
}

impl MemoryActivityStore {
    /// All entries in insertion order.
    pub async fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl ActivitySink for MemoryActivityStore {
    async fn append(&self, entry: NewActivity) -> Result<(), StoreError> {
        let stored = ActivityLogEntry {
            id: Uuid::now_v7(),
            user_id: entry.user_id,
            activity_type: entry.activity_type,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            description: entry.description,
            metadata: entry.metadata,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: Utc::now(),
        };
        self.entries.write().await.push(stored);
        Ok(())
    }

    async fn list(&self, query: &ActivityQuery) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let entries = self.entries.read().await;
        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(entries
            .iter()
            .rev()
            .filter(|e| {
                query
                    .entity_type
                    .as_deref()
                    .is_none_or(|t| e.entity_type == t)
            })
            .filter(|e| query.user_id.is_none_or(|id| e.user_id == Some(id)))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
