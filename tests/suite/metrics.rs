//! Metrics exposition and sample counts.

use std::sync::Arc;

use serde_json::json;
use taskboard_metrics::Metrics;
use taskboard_server::{App, Composition, Surface, serve};
use taskboard_store::{MemoryStore, Store};
use taskboard_types::Mode;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::common::{http, start_memory};

#[tokio::test]
async fn one_create_is_one_store_sample() {
    let server = start_memory(Mode::ApiOnly).await;
    let client = http();

    let response = client
        .post(server.url("/api/items"))
        .json(&json!({"title": "once", "description": "counted"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(
        server.metrics.counter_value(
            "store_operations_total",
            &[("kind", "create"), ("name", "create"), ("success", "true")]
        ),
        Some(1)
    );
    assert_eq!(server.metrics.counter_total("store_operations_total"), 1);
    assert_eq!(
        server.metrics.counter_value(
            "http_requests_total",
            &[("method", "POST"), ("route", "/api/items"), ("status_code", "200")]
        ),
        Some(1)
    );

    server.shutdown().await;
}

#[tokio::test]
async fn http_requests_use_normalized_routes() {
    let server = start_memory(Mode::Combined).await;
    let client = http();

    for id in [7, 8, 9] {
        client
            .post(server.url(&format!("/api/items/{id}/resolve")))
            .send()
            .await
            .unwrap();
    }
    client.get(server.url("/no/such/path")).send().await.unwrap();

    assert_eq!(
        server.metrics.counter_value(
            "http_requests_total",
            &[
                ("method", "POST"),
                ("route", "/api/items/:id/resolve"),
                ("status_code", "200")
            ]
        ),
        Some(3)
    );
    assert_eq!(
        server.metrics.counter_value(
            "http_requests_total",
            &[("method", "GET"), ("route", "unmatched"), ("status_code", "404")]
        ),
        Some(1)
    );
    assert_eq!(server.metrics.counter_total("http_requests_total"), 4);

    let text = client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("# TYPE http_requests_total counter"));
    assert!(text.contains("store_operation_duration_seconds"));

    server.shutdown().await;
}

#[tokio::test]
async fn separate_metrics_port_serves_only_metrics() {
    let metrics = Arc::new(Metrics::new());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store.init().await.unwrap();
    let composition = Composition::local(Mode::Combined, store, Arc::clone(&metrics), true).unwrap();
    let app = Arc::new(App::new(composition, metrics));

    let main = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let scrape = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let main_base = format!("http://{}", main.local_addr().unwrap());
    let scrape_base = format!("http://{}", scrape.local_addr().unwrap());

    let (stop, rx) = watch::channel(false);
    let mut tasks = Vec::new();
    for (listener, surface) in [(main, Surface::Main), (scrape, Surface::Metrics)] {
        let mut rx = rx.clone();
        tasks.push(tokio::spawn(serve(listener, Arc::clone(&app), surface, async move {
            let _ = rx.wait_for(|stop| *stop).await;
        })));
    }

    let client = http();
    let response = client.get(format!("{main_base}/metrics")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let response = client.get(format!("{scrape_base}/metrics")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let response = client.get(format!("{scrape_base}/api/items")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let response = client.get(format!("{main_base}/api/items")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let _ = stop.send(true);
    for task in tasks {
        task.await.unwrap();
    }
}
