//! Best-effort audit trail.
//!
//! Handlers publish entries through [`ActivityLogger::record`], which never
//! fails or blocks the caller. A background task drains the channel into the
//! configured [`ActivitySink`]; sink failures are reported with `tracing` and
//! the entry is dropped.

pub mod request;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db::ActivitySink;
use crate::models::{ActivityType, NewActivity};

pub use request::{ClientAddr, RequestContext};

/// Who performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(Uuid),
    /// Automated or anonymous actions. Stored with a null user id.
    System,
}

impl Actor {
    pub const SYSTEM_SENTINEL: &'static str = "system";

    /// Accepts a user id or the literal `"system"`.
    pub fn parse(raw: &str) -> Self {
        if raw == Self::SYSTEM_SENTINEL {
            return Actor::System;
        }
        match Uuid::parse_str(raw) {
            Ok(id) => Actor::User(id),
            Err(_) => {
                tracing::warn!("Unrecognized actor id '{raw}', recording as system");
                Actor::System
            }
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::System => None,
        }
    }
}

impl From<&AuthUser> for Actor {
    fn from(auth: &AuthUser) -> Self {
        Actor::User(auth.user_id)
    }
}

impl NewActivity {
    pub fn new(
        actor: Actor,
        activity_type: ActivityType,
        entity_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let entity_type = entity_type.into();
        let mut description = description.into();
        if description.trim().is_empty() {
            description = format!("{} {}", activity_type.as_str(), entity_type);
        }
        let context = RequestContext::default();

        Self {
            user_id: actor.user_id(),
            activity_type,
            entity_type,
            entity_id: None,
            description,
            metadata: None,
            ip_address: context.ip_address,
            user_agent: context.user_agent,
        }
    }

    pub fn entity_id(mut self, id: Uuid) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn context(mut self, context: &RequestContext) -> Self {
        self.ip_address = context.ip_address.clone();
        self.user_agent = context.user_agent.clone();
        self
    }
}

enum Command {
    Record(NewActivity),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct ActivityLogger {
    tx: mpsc::UnboundedSender<Command>,
}

impl ActivityLogger {
    /// Starts the consumer task. Must be called inside a Tokio runtime.
    pub fn spawn(sink: Arc<dyn ActivitySink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(consume(sink, rx));
        Self { tx }
    }

    pub fn record(&self, entry: NewActivity) {
        let entity_type = entry.entity_type.clone();
        if self.tx.send(Command::Record(entry)).is_err() {
            tracing::error!(entity_type = %entity_type, "Activity log consumer is gone, entry dropped");
        }
    }

    /// Resolves once every entry recorded before this call has been handled.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

async fn consume(sink: Arc<dyn ActivitySink>, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Record(entry) => {
                let activity_type = entry.activity_type.as_str();
                let entity_type = entry.entity_type.clone();
                if let Err(e) = sink.append(entry).await {
                    tracing::error!(activity_type, entity_type = %entity_type, "Failed to record activity: {e}");
                }
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("Activity log consumer stopped");
}
