//! Shared test utilities and fixtures
//!
//! Spins up real listeners on ephemeral ports and fake peers on wiremock.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskboard_metrics::Metrics;
use taskboard_proxy::RemoteClient;
use taskboard_server::{App, Composition, Surface, serve};
use taskboard_store::{MemoryStore, SqliteStore, Store};
use taskboard_types::Mode;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A server bound to `127.0.0.1:0`.
pub struct TestServer {
    pub base: String,
    pub app: Arc<App>,
    pub metrics: Arc<Metrics>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(composition: Composition, metrics: Arc<Metrics>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Arc::new(App::new(composition, Arc::clone(&metrics)));
        let (stop, mut rx) = watch::channel(false);
        let task = tokio::spawn(serve(listener, Arc::clone(&app), Surface::Main, async move {
            let _ = rx.wait_for(|stop| *stop).await;
        }));
        Self {
            base: format!("http://{addr}"),
            app,
            metrics,
            stop,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        self.task.await.unwrap();
        self.app.composition().items.close().await;
    }
}

pub fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Local-data server over an in-memory store.
pub async fn start_memory(mode: Mode) -> TestServer {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    start_with_store(mode, store).await
}

/// Local-data server over a SQLite file in `dir`.
pub async fn start_sqlite(mode: Mode, dir: &tempfile::TempDir, pool_size: usize) -> TestServer {
    let store = SqliteStore::open(dir.path().join("items.db"), pool_size, Duration::from_secs(5))
        .unwrap();
    start_with_store(mode, Arc::new(store)).await
}

pub async fn start_with_store(mode: Mode, store: Arc<dyn Store>) -> TestServer {
    store.init().await.unwrap();
    let metrics = Arc::new(Metrics::new());
    let composition = Composition::local(mode, store, Arc::clone(&metrics), false).unwrap();
    TestServer::start(composition, metrics).await
}

/// ui-proxy server forwarding to `peer_url`.
pub async fn start_proxy(peer_url: &str) -> TestServer {
    let metrics = Arc::new(Metrics::new());
    let peer = RemoteClient::new(peer_url, Duration::from_secs(2)).unwrap();
    TestServer::start(Composition::delegated(peer, false), metrics).await
}

/// Mount one expected call per item endpoint on a fake peer.
pub async fn mount_peer_api(server: &MockServer) {
    let ok = ResponseTemplate::new(200).set_body_json(json!({"success": true}));
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "title": "from peer",
            "description": "remote",
            "status": "todo",
            "resolved": false,
            "order_index": 0,
            "created_at": "2024-05-01T10:00:00.000Z"
        }])))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "id": 2})))
        .expect(1)
        .mount(server)
        .await;
    for (verb, route) in [
        ("DELETE", "/api/items/1"),
        ("POST", "/api/items/1/status"),
        ("POST", "/api/items/1/resolve"),
        ("POST", "/api/items/1/unresolve"),
        ("POST", "/api/items/1/position"),
        ("POST", "/api/items/reorder"),
    ] {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ok.clone())
            .expect(1)
            .mount(server)
            .await;
    }
}

/// Fake peer `/health`.
pub async fn mount_peer_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "timestamp": "2024-05-01T10:00:00.000Z",
            "hostname": "api-1",
            "version": "0.1.0",
            "mode": "api-only",
            "databaseType": "sqlite",
            "apiBaseUrl": "N/A"
        })))
        .mount(server)
        .await;
}
