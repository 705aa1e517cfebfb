#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use humanika::config::Config;
use humanika::db::memory::MemoryDatabase;
use humanika::db::{ActivitySink, Database, StoreError};
use humanika::models::{ActivityLogEntry, ActivityQuery, NewActivity};
use humanika::state::{AppState, SharedState};

pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const ADMIN_PASSWORD: &str = "password123";

/// A running test server backed by the in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: SharedState,
    pub memory: Arc<MemoryDatabase>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Waits for pending activity entries, then returns everything stored.
    pub async fn logs(&self) -> Vec<ActivityLogEntry> {
        self.state.activity.flush().await;
        self.memory.activity.entries().await
    }

    pub async fn logs_for(&self, entity_type: &str) -> Vec<ActivityLogEntry> {
        self.logs()
            .await
            .into_iter()
            .filter(|e| e.entity_type == entity_type)
            .collect()
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": password, "name": name }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Registers the first administrator and returns its session token.
    pub async fn bootstrap(&self) -> String {
        let (body, status) = self.register(ADMIN_EMAIL, ADMIN_PASSWORD, "Admin").await;
        assert_eq!(status, StatusCode::CREATED, "bootstrap register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a member through the admin API and logs in as them.
    pub async fn member_token(&self, admin_token: &str, email: &str) -> String {
        let (body, status) = self
            .post_auth(
                "/api/users",
                admin_token,
                &json!({ "name": "Member", "email": email, "password": "memberpass1" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create member failed: {body}");
        let (body, status) = self.login(email, "memberpass1").await;
        assert_eq!(status, StatusCode::OK, "member login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Sends `body` verbatim, for exercising malformed payloads.
    pub async fn post_raw(
        &self,
        path: &str,
        token: &str,
        content_type: &str,
        body: &str,
    ) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .header("content-type", content_type)
            .body(body.to_string())
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Creates a record and returns its JSON, asserting a 201.
    pub async fn create(&self, path: &str, token: &str, body: &Value) -> Value {
        let (created, status) = self.post_auth(path, token, body).await;
        assert_eq!(status, StatusCode::CREATED, "create {path} failed: {created}");
        created
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        session_ttl_secs: 3600,
        max_body_size: 1_048_576,
        trusted_proxies: Vec::new(),
        log_level: "warn".to_string(),
        public_reads: None,
        contact_recipient: None,
        smtp: None,
    }
}

/// An activity sink whose every write fails.
pub struct FailingSink;

#[async_trait]
impl ActivitySink for FailingSink {
    async fn append(&self, _entry: NewActivity) -> Result<(), StoreError> {
        Err(StoreError::Decode("activity store unavailable".to_string()))
    }

    async fn list(&self, _query: &ActivityQuery) -> Result<Vec<ActivityLogEntry>, StoreError> {
        Err(StoreError::Decode("activity store unavailable".to_string()))
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), None).await
}

pub async fn spawn_app_with_config(config: Config) -> TestApp {
    spawn_app_with(config, None).await
}

/// Spawns a server whose activity logger writes to a failing sink.
pub async fn spawn_app_with_failing_logger() -> TestApp {
    spawn_app_with(test_config(), Some(Arc::new(FailingSink))).await
}

async fn spawn_app_with(config: Config, sink: Option<Arc<dyn ActivitySink>>) -> TestApp {
    let memory = Arc::new(MemoryDatabase::default());
    let db = Database::Memory(memory.clone());

    let state: SharedState = Arc::new(match sink {
        Some(sink) => AppState::with_activity_sink(&db, config, sink),
        None => AppState::new(&db, config),
    });
    let app = humanika::router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        client,
        state,
        memory,
    }
}
