//! Per-mode route exposure and ui-proxy forwarding.

use serde_json::{Value, json};
use taskboard_types::Mode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{http, mount_peer_api, mount_peer_health, start_memory, start_proxy};

#[tokio::test]
async fn api_only_has_no_ui() {
    let server = start_memory(Mode::ApiOnly).await;
    let client = http();

    let response = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client.get(server.url("/api/items")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let health: Value = client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["mode"], "api-only");
    assert_eq!(health["databaseType"], "memory");
    assert_eq!(health["apiBaseUrl"], "N/A");

    server.shutdown().await;
}

#[tokio::test]
async fn combined_serves_ui_and_api() {
    let server = start_memory(Mode::Combined).await;
    let client = http();

    let response = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let html = response.text().await.unwrap();
    assert!(html.contains("mode combined"));

    server.shutdown().await;
}

#[tokio::test]
async fn ui_proxy_forwards_every_item_operation_once() {
    let peer = MockServer::start().await;
    mount_peer_api(&peer).await;
    let server = start_proxy(&peer.uri()).await;
    let client = http();

    let listed: Vec<Value> = client
        .get(server.url("/api/items"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "from peer");

    let created: Value = client
        .post(server.url("/api/items"))
        .json(&json!({"title": "new", "description": "via proxy"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["id"], 2);

    let calls = [
        (reqwest::Method::DELETE, "/api/items/1", Value::Null),
        (reqwest::Method::POST, "/api/items/1/status", json!({"status": "done"})),
        (reqwest::Method::POST, "/api/items/1/resolve", Value::Null),
        (reqwest::Method::POST, "/api/items/1/unresolve", Value::Null),
        (reqwest::Method::POST, "/api/items/1/position", json!({"position": 3})),
        (
            reqwest::Method::POST,
            "/api/items/reorder",
            json!({"draggedId": 1, "targetId": 2}),
        ),
    ];
    for (verb, route, body) in calls {
        let mut request = client.request(verb, server.url(route));
        if !body.is_null() {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 200, "{route}");
    }

    assert_eq!(server.metrics.counter_total("store_operations_total"), 0);
    server.shutdown().await;
    // Dropping the mock server verifies each `.expect(1)`.
}

#[tokio::test]
async fn ui_proxy_health_reports_peer_address() {
    let peer = MockServer::start().await;
    let server = start_proxy(&peer.uri()).await;

    let health: Value = http()
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["mode"], "ui-proxy");
    assert_eq!(health["databaseType"], "N/A");
    assert_eq!(health["apiBaseUrl"], peer.uri().trim_end_matches('/'));

    server.shutdown().await;
}

#[tokio::test]
async fn ui_proxy_page_shows_peer_state() {
    let peer = MockServer::start().await;
    mount_peer_health(&peer).await;
    let server = start_proxy(&peer.uri()).await;

    let html = http()
        .get(server.url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Connected to API"));
    assert!(html.contains("api-1"));
    server.shutdown().await;

    // Nothing listens here, so the banner degrades but the page still renders.
    let server = start_proxy("http://127.0.0.1:9").await;
    let response = http().get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let html = response.text().await.unwrap();
    assert!(html.contains("class=\"banner degraded\""));
    server.shutdown().await;
}

#[tokio::test]
async fn ui_proxy_relays_peer_errors() {
    let peer = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/items"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Title is required"})),
        )
        .expect(1)
        .mount(&peer)
        .await;
    let server = start_proxy(&peer.uri()).await;

    let response = http()
        .post(server.url("/api/items"))
        .json(&json!({"title": "", "description": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Title is required"));

    server.shutdown().await;
}

#[tokio::test]
async fn ui_proxy_with_unreachable_peer_is_bad_gateway() {
    let server = start_proxy("http://127.0.0.1:9").await;

    let response = http().get(server.url("/api/items")).send().await.unwrap();
    assert_eq!(response.status(), 502);

    server.shutdown().await;
}

#[tokio::test]
async fn ui_proxy_create_passes_on_ack_without_id() {
    let peer = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&peer)
        .await;
    let server = start_proxy(&peer.uri()).await;

    let response = http()
        .post(server.url("/api/items"))
        .json(&json!({"title": "saved", "description": "upstream"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": true}));

    server.shutdown().await;
}
