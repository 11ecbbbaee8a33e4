//! Full item lifecycle over real TCP.

use serde_json::{Value, json};
use taskboard_types::Mode;

use crate::common::{http, start_memory, start_sqlite};

async fn titles(client: &reqwest::Client, url: &str) -> Vec<String> {
    let items: Vec<Value> = client.get(url).send().await.unwrap().json().await.unwrap();
    items
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}

async fn create(client: &reqwest::Client, url: &str, title: &str) -> i64 {
    let created: Value = client
        .post(url)
        .json(&json!({"title": title, "description": "details"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["success"], true);
    created["id"].as_i64().unwrap()
}

#[tokio::test]
async fn sqlite_lifecycle_in_combined_mode() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_sqlite(Mode::Combined, &dir, 4).await;
    let client = http();
    let items = server.url("/api/items");

    let a = create(&client, &items, "A").await;
    let b = create(&client, &items, "B").await;
    let c = create(&client, &items, "C").await;
    assert_eq!(titles(&client, &items).await, ["A", "B", "C"]);

    let response = client
        .post(server.url("/api/items/reorder"))
        .json(&json!({"draggedId": a, "targetId": c}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(titles(&client, &items).await, ["B", "C", "A"]);

    let response = client
        .post(server.url(&format!("/api/items/{b}/status")))
        .json(&json!({"status": "completed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let listed: Vec<Value> = client.get(&items).send().await.unwrap().json().await.unwrap();
    let done = listed.iter().find(|item| item["id"] == b).unwrap();
    assert_eq!(done["status"], "completed");
    assert_eq!(done["resolved"], true);
    assert!(done["created_at"].as_str().unwrap().ends_with('Z'));

    client
        .post(server.url(&format!("/api/items/{b}/unresolve")))
        .send()
        .await
        .unwrap();
    let listed: Vec<Value> = client.get(&items).send().await.unwrap().json().await.unwrap();
    let reopened = listed.iter().find(|item| item["id"] == b).unwrap();
    assert_eq!(reopened["status"], "todo");
    assert_eq!(reopened["resolved"], false);

    let response = client
        .delete(server.url(&format!("/api/items/{c}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let response = client
        .delete(server.url(&format!("/api/items/{c}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(titles(&client, &items).await, ["B", "A"]);

    server.shutdown().await;

    // The file outlives the process.
    let server = start_sqlite(Mode::ApiOnly, &dir, 2).await;
    assert_eq!(titles(&client, &server.url("/api/items")).await, ["B", "A"]);
    server.shutdown().await;
}

#[tokio::test]
async fn validation_errors_are_400() {
    let server = start_memory(Mode::Combined).await;
    let client = http();

    let response = client
        .post(server.url("/api/items"))
        .json(&json!({"title": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let id = create(&client, &server.url("/api/items"), "task").await;
    let response = client
        .post(server.url(&format!("/api/items/{id}/status")))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .post(server.url("/api/items"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_and_empty_statuses_are_stored_verbatim() {
    let server = start_memory(Mode::Combined).await;
    let client = http();
    let items = server.url("/api/items");
    let empty = create(&client, &items, "empty").await;
    let custom = create(&client, &items, "custom").await;
    let plain = create(&client, &items, "plain").await;

    for (id, status) in [(empty, ""), (custom, "blocked")] {
        let response = client
            .post(server.url(&format!("/api/items/{id}/status")))
            .json(&json!({"status": status}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
    }

    let listed: Vec<Value> = client.get(&items).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed[0]["id"], plain);
    let stored = |id: i64| {
        listed
            .iter()
            .find(|item| item["id"] == id)
            .map(|item| (item["status"].clone(), item["resolved"].clone()))
            .unwrap()
    };
    assert_eq!(stored(empty), (json!(""), json!(false)));
    assert_eq!(stored(custom), (json!("blocked"), json!(false)));

    server.shutdown().await;
}

#[tokio::test]
async fn reorder_with_unknown_id_is_a_server_error() {
    let server = start_memory(Mode::Combined).await;
    let client = http();
    let id = create(&client, &server.url("/api/items"), "only").await;

    let response = client
        .post(server.url("/api/items/reorder"))
        .json(&json!({"draggedId": id, "targetId": 9999}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_paths_and_methods() {
    let server = start_memory(Mode::Combined).await;
    let client = http();

    let response = client.get(server.url("/nope")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client.put(server.url("/api/items")).send().await.unwrap();
    assert_eq!(response.status(), 405);
    let allow = response.headers()["allow"].to_str().unwrap().to_string();
    assert!(allow.contains("GET"));
    assert!(allow.contains("POST"));

    let response = client.delete(server.url("/api/items/abc")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    server.shutdown().await;
}
