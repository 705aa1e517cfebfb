//! Typed HTTP client for the resource endpoints.
//!
//! Every call returns a `Result`; non-2xx responses become a [`ClientError`]
//! carrying the server's `error` message when one was sent.

use std::marker::PhantomData;

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::resource::{ListQuery, Record, Resource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    /// HTTP status, absent when the request never got a response.
    pub status: Option<u16>,
    pub message: String,
}

impl ClientError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ClientError {}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn resource<R: Resource>(&self) -> ResourceClient<R> {
        ResourceClient {
            api: self.clone(),
            _marker: PhantomData,
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str, verb: &str, label: &str) -> Result<Url, ClientError> {
        Url::parse(&format!("{}{path}", self.base_url)).map_err(|e| {
            tracing::debug!("Invalid request URL for {path}: {e}");
            ClientError::new(None, format!("Failed to {verb} {label}"))
        })
    }
}

pub struct ResourceClient<R> {
    api: ApiClient,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            _marker: PhantomData,
        }
    }
}

impl<R: Resource> ResourceClient<R> {
    fn collection_path() -> String {
        format!("/api/{}", R::PATH)
    }

    fn item_path(id: Uuid) -> String {
        format!("/api/{}/{id}", R::PATH)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Record<R>>, ClientError> {
        let mut url = self.api.url(&Self::collection_path(), "fetch", R::LABEL)?;
        append_query(&mut url, query);
        let resp = self.api.request(Method::GET, url).send().await;
        read_json(resp, "fetch", R::LABEL).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Record<R>, ClientError> {
        let url = self.api.url(&Self::item_path(id), "fetch", R::LABEL)?;
        let resp = self.api.request(Method::GET, url).send().await;
        read_json(resp, "fetch", R::LABEL).await
    }

    pub async fn create(&self, draft: &R::Draft) -> Result<Record<R>, ClientError> {
        let url = self.api.url(&Self::collection_path(), "create", R::LABEL)?;
        let resp = self.api.request(Method::POST, url).json(draft).send().await;
        read_json(resp, "create", R::LABEL).await
    }

    pub async fn update(&self, id: Uuid, patch: &R::Patch) -> Result<Record<R>, ClientError> {
        let url = self.api.url(&Self::item_path(id), "update", R::LABEL)?;
        let resp = self.api.request(Method::PUT, url).json(patch).send().await;
        read_json(resp, "update", R::LABEL).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        let url = self.api.url(&Self::item_path(id), "delete", R::LABEL)?;
        let resp = self.api.request(Method::DELETE, url).send().await;
        read_json::<Value>(resp, "delete", R::LABEL).await.map(|_| ())
    }
}

fn append_query(url: &mut Url, query: &ListQuery) {
    let page = query.page.map(|p| p.to_string());
    let limit = query.limit.map(|l| l.to_string());
    let pairs = [
        ("page", page.as_deref()),
        ("limit", limit.as_deref()),
        ("search", query.search.as_deref()),
        ("status", query.status.as_deref()),
        ("periodId", query.period_id.as_deref()),
        ("categoryId", query.category_id.as_deref()),
        ("typeId", query.type_id.as_deref()),
    ];
    if pairs.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    let mut serializer = url.query_pairs_mut();
    for (key, value) in pairs {
        if let Some(value) = value {
            serializer.append_pair(key, value);
        }
    }
}

async fn read_json<T: DeserializeOwned>(
    resp: Result<Response, reqwest::Error>,
    verb: &str,
    label: &str,
) -> Result<T, ClientError> {
    let resp = resp.map_err(|e| {
        tracing::warn!("Request to {verb} {label} failed: {e}");
        ClientError::new(None, format!("Failed to {verb} {label}"))
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(failure(resp, verb, label).await);
    }

    resp.json::<T>().await.map_err(|e| {
        tracing::warn!("Unexpected response body to {verb} {label}: {e}");
        ClientError::new(Some(status.as_u16()), format!("Failed to {verb} {label}"))
    })
}

async fn failure(resp: Response, verb: &str, label: &str) -> ClientError {
    let status = resp.status().as_u16();
    let server_message = resp
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .filter(|msg| !msg.trim().is_empty());

    ClientError::new(
        Some(status),
        server_message.unwrap_or_else(|| format!("Failed to {verb} {label}")),
    )
}

