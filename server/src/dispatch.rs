//! Request dispatch.
//!
//! Transport-independent: takes a method, path and body, resolves the route,
//! runs the operation and renders the response. Every request, including 404s
//! and 405s, is recorded once in the HTTP metrics.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use hyper::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use taskboard_metrics::{CONTENT_TYPE as METRICS_CONTENT_TYPE, Metrics, normalize_route};
use taskboard_types::{
    Ack, CreateRequest, Error, ErrorBody, ItemId, PositionRequest, ReorderRequest, Result, Status,
    StatusRequest,
};

use crate::compose::Composition;
use crate::routes::{Operation, Resolution, RouteTable};
use crate::{health, ui};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Route label for requests that matched nothing, so unknown paths cannot grow
/// the label set.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Which listener a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Main,
    Metrics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// `Allow` header value on 405 responses.
    pub allow: Option<String>,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                content_type: JSON_CONTENT_TYPE,
                body,
                allow: None,
            },
            Err(err) => Self::error(&Error::Store(format!("failed to encode response: {err}"))),
        }
    }

    fn error(err: &Error) -> Self {
        Self::failure(err.status_code(), err.to_string())
    }

    /// `{success:false, error}` with an explicit status. 404 and 405 come straight here.
    fn failure(status: u16, message: String) -> Self {
        let body = serde_json::to_string(&ErrorBody::new(message))
            .unwrap_or_else(|_| r#"{"success":false,"error":"internal error"}"#.to_string());
        Self {
            status,
            content_type: JSON_CONTENT_TYPE,
            body,
            allow: None,
        }
    }

    fn ack() -> Self {
        Self::json(200, &Ack::ok())
    }

    fn text(status: u16, content_type: &'static str, body: String) -> Self {
        Self {
            status,
            content_type,
            body,
            allow: None,
        }
    }
}

/// Shared request handler state.
pub struct App {
    composition: Composition,
    metrics: Arc<Metrics>,
    scrape_routes: RouteTable,
}

impl App {
    #[must_use]
    pub fn new(composition: Composition, metrics: Arc<Metrics>) -> Self {
        let scrape_routes = composition
            .metrics_routes
            .clone()
            .unwrap_or_else(RouteTable::metrics_only);
        Self {
            composition,
            metrics,
            scrape_routes,
        }
    }

    #[must_use]
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Serve one request. `body` is `Err` when the transport could not read it.
    pub async fn handle(
        &self,
        surface: Surface,
        method: &Method,
        path: &str,
        body: Result<Bytes>,
    ) -> ApiResponse {
        let started = Instant::now();
        let table = match surface {
            Surface::Main => &self.composition.routes,
            Surface::Metrics => &self.scrape_routes,
        };

        let (route, response) = match table.resolve(method, path) {
            Resolution::Matched { operation, id } => {
                let response = match body {
                    Ok(body) => self
                        .run(operation, id, &body)
                        .await
                        .unwrap_or_else(|err| ApiResponse::error(&err)),
                    Err(err) => ApiResponse::error(&err),
                };
                (normalize_route(path), response)
            }
            Resolution::MethodNotAllowed { allowed } => {
                let mut response =
                    ApiResponse::failure(405, format!("method {method} not allowed"));
                response.allow = Some(
                    allowed
                        .iter()
                        .map(Method::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                );
                (normalize_route(path), response)
            }
            Resolution::NotFound => {
                (UNMATCHED_ROUTE.to_string(), ApiResponse::failure(404, "not found".to_string()))
            }
        };

        let elapsed = started.elapsed();
        self.metrics.record_http_request(
            method.as_str(),
            &route,
            response.status,
            elapsed.as_secs_f64(),
        );
        if response.status >= 500 {
            tracing::error!(
                %method,
                route = %route,
                status = response.status,
                error = %response.body,
                "Request failed"
            );
        } else {
            tracing::debug!(
                %method,
                route = %route,
                status = response.status,
                latency_ms = elapsed.as_millis() as u64,
                "Request served"
            );
        }
        response
    }

    async fn run(&self, operation: Operation, id: Option<ItemId>, body: &[u8]) -> Result<ApiResponse> {
        let items = &self.composition.items;
        match operation {
            Operation::Ui => {
                let html = ui::render(self.composition.mode, items.peer()).await;
                Ok(ApiResponse::text(200, HTML_CONTENT_TYPE, html))
            }
            Operation::Health => Ok(ApiResponse::json(200, &health::report(&self.composition))),
            Operation::Metrics => Ok(ApiResponse::text(
                200,
                METRICS_CONTENT_TYPE,
                self.metrics.snapshot(),
            )),
            Operation::List => Ok(ApiResponse::json(200, &items.list().await?)),
            Operation::Create => {
                let request: CreateRequest = parse_body(body)?;
                let ack = match items.create(&request.title, &request.description).await? {
                    Some(id) => Ack::created(id),
                    None => Ack::ok(),
                };
                Ok(ApiResponse::json(200, &ack))
            }
            Operation::Delete => {
                items.delete(require_id(id)?).await?;
                Ok(ApiResponse::ack())
            }
            Operation::SetStatus => {
                let request: StatusRequest = parse_body(body)?;
                items
                    .set_status(require_id(id)?, &Status::parse(&request.status))
                    .await?;
                Ok(ApiResponse::ack())
            }
            Operation::Resolve => {
                items.resolve(require_id(id)?).await?;
                Ok(ApiResponse::ack())
            }
            Operation::Unresolve => {
                items.unresolve(require_id(id)?).await?;
                Ok(ApiResponse::ack())
            }
            Operation::SetPosition => {
                let request: PositionRequest = parse_body(body)?;
                items.set_position(require_id(id)?, request.position).await?;
                Ok(ApiResponse::ack())
            }
            Operation::Reorder => {
                let request: ReorderRequest = parse_body(body)?;
                items.reorder(request.dragged_id, request.target_id).await?;
                Ok(ApiResponse::ack())
            }
        }
    }
}

fn require_id(id: Option<ItemId>) -> Result<ItemId> {
    id.ok_or_else(|| Error::Validation("missing item id".to_string()))
}

/// Decode a JSON body. An empty body reads as `{}`.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| Error::Validation(format!("invalid request body: {e}")))
}
