//! HTTP/1 accept loop on hyper.
//!
//! Each connection runs on its own task. When the shutdown future resolves the
//! loop stops accepting; connections already running are not drained.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use taskboard_types::Error;
use tokio::net::TcpListener;

use crate::dispatch::{ApiResponse, App, Surface};

/// Request bodies above this size are rejected before dispatch.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Accept connections on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Arc<App>,
    surface: Surface,
    shutdown: impl Future<Output = ()> + Send,
) {
    tokio::pin!(shutdown);
    let local = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_default();
    loop {
        tokio::select! {
            () = &mut shutdown => {
                tracing::info!(addr = %local, ?surface, "Listener stopped accepting");
                return;
            }
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        tracing::warn!(addr = %local, error = %err, "Accept failed");
                        continue;
                    }
                };
                let app = Arc::clone(&app);
                tokio::spawn(async move {
                    let service = service_fn(move |request| {
                        let app = Arc::clone(&app);
                        async move { Ok::<_, Infallible>(handle(&app, surface, request).await) }
                    });
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        tracing::debug!(%remote, error = %err, "Connection closed with error");
                    }
                });
            }
        }
    }
}

async fn handle(app: &App, surface: Surface, request: Request<Incoming>) -> Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();
    let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) => Err(Error::Validation(format!("unreadable request body: {err}"))),
    };
    let path = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
    let response = app.handle(surface, &parts.method, path, body).await;
    into_response(response)
}

fn into_response(response: ApiResponse) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = Response::new(Full::new(Bytes::from(response.body)));
    *out.status_mut() = status;
    out.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(response.content_type));
    if let Some(allow) = response.allow
        && let Ok(value) = HeaderValue::from_str(&allow)
    {
        out.headers_mut().insert(ALLOW, value);
    }
    out
}
