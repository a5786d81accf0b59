//! Supabase adapters over a shared `reqwest` client.
//!
//! Each adapter is a thin mapping from one port onto one Supabase API:
//! GoTrue for auth, PostgREST for tables, Storage for objects.

mod auth;
mod rest;
mod storage;

pub use auth::SupabaseAuth;
pub use rest::SupabaseTables;
pub use storage::SupabaseStorage;

use crate::config::SupabaseConfig;
use crate::error::PortalError;
use reqwest::{RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Project endpoint, keys and HTTP client shared by all adapters.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base: Url,
    anon_key: Arc<str>,
    api_key: Arc<str>,
}

impl SupabaseClient {
    pub fn new(cfg: &SupabaseConfig) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("kara-portal/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self::with_http(http, cfg.url.clone(), &cfg.anon_key, cfg.api_key()))
    }

    pub fn with_http(http: reqwest::Client, mut base: Url, anon_key: &str, api_key: &str) -> Self {
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            http,
            base,
            anon_key: Arc::from(anon_key),
            api_key: Arc::from(api_key),
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, PortalError> {
        Ok(self.base.join(path)?)
    }

    /// Request authorized with the project key (service role when configured).
    pub(crate) fn privileged(&self, method: reqwest::Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.api_key.as_ref())
    }

    /// Request on behalf of an end user: anon key plus the user's access token.
    pub(crate) fn as_user(
        &self,
        method: reqwest::Method,
        url: Url,
        access_token: Option<&str>,
    ) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("apikey", self.anon_key.as_ref());
        match access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Turn non-success statuses into `UpstreamStatus` carrying the service's message.
pub(crate) async fn check(resp: Response, op: &str) -> Result<Response, PortalError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = upstream_message(&body);
    warn!(op, status = %status, message = %message, "supabase request failed");
    Err(PortalError::UpstreamStatus {
        status: axum::http::StatusCode::from_u16(status.as_u16())
            .unwrap_or(axum::http::StatusCode::BAD_GATEWAY),
        message,
    })
}

/// Supabase services disagree on the error field name; take the first one present.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
