//! Remote proxy client.
//!
//! A ui-proxy process owns no data: every item operation becomes exactly one
//! HTTP call to the peer's equivalent `/api/items` endpoint. Calls are bounded
//! by a fixed timeout and never retried.
//!
//! Failures map onto [`Error::PeerUnavailable`]:
//!
//! - transport errors and timeouts carry no status (served as 502),
//! - non-2xx answers carry the peer's status and, when the body has one, the
//!   peer's `error` message.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use taskboard_types::{
    Ack, CreateRequest, Error, ItemId, PositionRequest, Record, ReorderRequest, Result,
    StatusRequest,
};
use url::Url;

/// Default bound on one peer call, connect included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

/// Subset of the peer's `/health` payload shown in the UI banner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerHealth {
    pub status: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Deserialize)]
struct PeerError {
    error: String,
}

pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    /// Build a client for the peer at `base_url`.
    ///
    /// The address must be an absolute `http` or `https` URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(Error::Configuration(
                "ui-proxy mode requires a peer address (API_BASE_URL)".to_string(),
            ));
        }
        let parsed = Url::parse(trimmed)
            .map_err(|e| Error::Configuration(format!("invalid peer address {trimmed:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(Error::Configuration(format!(
                "peer address {trimmed:?} must be an http(s) URL with a host"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build peer client: {e}")))?;

        Ok(Self {
            http,
            base_url: trimmed.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list(&self) -> Result<Vec<Record>> {
        self.call_json(Method::GET, "/api/items", |req| req).await
    }

    /// Forward a create. The id is `None` when the peer's ack omits it.
    pub async fn create(&self, title: &str, description: &str) -> Result<Option<ItemId>> {
        let body = CreateRequest {
            title: title.to_string(),
            description: description.to_string(),
        };
        let ack: Ack = self
            .call_json(Method::POST, "/api/items", |req| req.json(&body))
            .await?;
        Ok(ack.id)
    }

    pub async fn delete(&self, id: ItemId) -> Result<()> {
        self.call_ack(Method::DELETE, &format!("/api/items/{id}"), |req| req)
            .await
    }

    pub async fn set_status(&self, id: ItemId, status: &str) -> Result<()> {
        let body = StatusRequest {
            status: status.to_string(),
        };
        self.call_ack(Method::POST, &format!("/api/items/{id}/status"), |req| {
            req.json(&body)
        })
        .await
    }

    pub async fn resolve(&self, id: ItemId) -> Result<()> {
        self.call_ack(Method::POST, &format!("/api/items/{id}/resolve"), |req| req)
            .await
    }

    pub async fn unresolve(&self, id: ItemId) -> Result<()> {
        self.call_ack(Method::POST, &format!("/api/items/{id}/unresolve"), |req| req)
            .await
    }

    pub async fn set_position(&self, id: ItemId, position: i64) -> Result<()> {
        let body = PositionRequest { position };
        self.call_ack(Method::POST, &format!("/api/items/{id}/position"), |req| {
            req.json(&body)
        })
        .await
    }

    pub async fn reorder(&self, dragged_id: ItemId, target_id: ItemId) -> Result<()> {
        let body = ReorderRequest {
            dragged_id,
            target_id,
        };
        self.call_ack(Method::POST, "/api/items/reorder", |req| req.json(&body))
            .await
    }

    pub async fn health(&self) -> Result<PeerHealth> {
        self.call_json(Method::GET, "/health", |req| req).await
    }

    async fn call_ack(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<()> {
        let _ack: Ack = self.call_json(method, path, build).await?;
        Ok(())
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let request = build(self.http.request(method.clone(), &url));
        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, %url, error = %e, "Peer request failed");
            Error::PeerUnavailable {
                status: None,
                message: format!("peer unreachable: {e}"),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            tracing::warn!(%method, %url, status = status.as_u16(), %message, "Peer returned an error");
            return Err(Error::PeerUnavailable {
                status: Some(status.as_u16()),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| Error::PeerUnavailable {
            status: None,
            message: format!("peer sent an unreadable response: {e}"),
        })
    }
}

async fn read_error_message(response: Response) -> String {
    let status = response.status();
    let fallback = format!("peer answered {status}");
    let Ok(body) = response.text().await else {
        return fallback;
    };
    if let Ok(parsed) = serde_json::from_str::<PeerError>(&body) {
        return parsed.error;
    }
    let mut message = body.trim().to_string();
    if message.is_empty() {
        return fallback;
    }
    if message.len() > MAX_ERROR_BODY_BYTES {
        let mut cut = MAX_ERROR_BODY_BYTES;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
        message.push_str("...(truncated)");
    }
    message
}
