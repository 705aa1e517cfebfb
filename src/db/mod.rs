pub mod activity;
pub mod documents;
pub mod memory;
pub mod users;

use std::sync::Arc;

use sqlx::PgPool;

pub use activity::{ActivitySink, PgActivityStore};
pub use documents::{DocumentQuery, DocumentStore, NewDocument, PgDocumentStore, SortOrder, StoredDocument};
pub use memory::MemoryDatabase;
pub use users::{PgUserStore, UserStore};

/// Errors raised by the persistence layer.
#[derive(Debug)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    Conflict(String),
    NotFound(String),
    /// Stored data could not be converted into its domain type.
    Decode(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            StoreError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            StoreError::Decode(msg) => write!(f, "Decode Error: {msg}"),
            StoreError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// The persistence backend the application runs against.
#[derive(Clone)]
pub enum Database {
    Postgres(PgPool),
    Memory(Arc<MemoryDatabase>),
}

impl Database {
    pub fn memory() -> Self {
        Database::Memory(Arc::new(MemoryDatabase::default()))
    }

    pub fn documents(&self) -> Arc<dyn DocumentStore> {
        match self {
            Database::Postgres(pool) => Arc::new(PgDocumentStore::new(pool.clone())),
            Database::Memory(mem) => mem.documents.clone(),
        }
    }

    pub fn users(&self) -> Arc<dyn UserStore> {
        match self {
            Database::Postgres(pool) => Arc::new(PgUserStore::new(pool.clone())),
            Database::Memory(mem) => mem.users.clone(),
        }
    }

    pub fn activity(&self) -> Arc<dyn ActivitySink> {
        match self {
            Database::Postgres(pool) => Arc::new(PgActivityStore::new(pool.clone())),
            Database::Memory(mem) => mem.activity.clone(),
        }
    }
}
