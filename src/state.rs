use std::sync::Arc;

use tokio::sync::Mutex;

use crate::activity::ActivityLogger;
use crate::auth::jwt::SessionSigner;
use crate::config::Config;
use crate::db::{ActivitySink, Database, DocumentStore, UserStore};
use crate::email::SystemMailer;
use crate::rate_limit::{ContactRateLimiter, LoginRateLimiter};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub sessions: SessionSigner,
    pub documents: Arc<dyn DocumentStore>,
    pub users: Arc<dyn UserStore>,
    pub activity_store: Arc<dyn ActivitySink>,
    pub activity: ActivityLogger,
    pub system_mailer: Option<Arc<SystemMailer>>,
    pub login_limiter: LoginRateLimiter,
    pub contact_limiter: ContactRateLimiter,
    /// Serializes bootstrap registration so only one first admin is created.
    pub registration: Mutex<()>,
}

impl AppState {
    pub fn new(db: &Database, config: Config) -> Self {
        Self::with_activity_sink(db, config, db.activity())
    }

    /// Like [`AppState::new`] but audit entries go to `sink` instead of the
    /// database's own activity store.
    pub fn with_activity_sink(db: &Database, config: Config, sink: Arc<dyn ActivitySink>) -> Self {
        let system_mailer = config.smtp.as_ref().and_then(|smtp| match SystemMailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!("System SMTP configured");
                Some(Arc::new(mailer))
            }
            Err(e) => {
                tracing::warn!("System SMTP not available: {e}");
                None
            }
        });

        let sessions = SessionSigner::new(&config.jwt_secret, config.session_ttl_secs);

        Self {
            config,
            sessions,
            documents: db.documents(),
            users: db.users(),
            activity_store: sink.clone(),
            activity: ActivityLogger::spawn(sink),
            system_mailer,
            login_limiter: LoginRateLimiter::new(),
            contact_limiter: ContactRateLimiter::new(),
            registration: Mutex::new(()),
        }
    }
}
