use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Create,
    Update,
    Delete,
    Verify,
    Login,
    Logout,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Create => "CREATE",
            ActivityType::Update => "UPDATE",
            ActivityType::Delete => "DELETE",
            ActivityType::Verify => "VERIFY",
            ActivityType::Login => "LOGIN",
            ActivityType::Logout => "LOGOUT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CREATE" => Some(ActivityType::Create),
            "UPDATE" => Some(ActivityType::Update),
            "DELETE" => Some(ActivityType::Delete),
            "VERIFY" => Some(ActivityType::Verify),
            "LOGIN" => Some(ActivityType::Login),
            "LOGOUT" => Some(ActivityType::Logout),
            _ => None,
        }
    }
}

/// A persisted audit entry. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    pub entity_type: Option<String>,
    pub user_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}
