//! Concurrent clients against one server.

use std::collections::HashSet;

use serde_json::{Value, json};
use taskboard_types::Mode;

use crate::common::{http, start_memory, start_sqlite};

const CLIENTS: usize = 16;

async fn create_concurrently(base: &str) -> Vec<i64> {
    let client = http();
    let mut tasks = Vec::new();
    for n in 0..CLIENTS {
        let client = client.clone();
        let url = format!("{base}/api/items");
        tasks.push(tokio::spawn(async move {
            let response = client
                .post(url)
                .json(&json!({"title": format!("item {n}"), "description": "load"}))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
            let body: Value = response.json().await.unwrap();
            body["id"].as_i64().unwrap()
        }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_creates_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_sqlite(Mode::ApiOnly, &dir, 4).await;

    let ids = create_concurrently(&server.base).await;
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), CLIENTS);

    let listed: Vec<Value> = http()
        .get(server.url("/api/items"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), CLIENTS);

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_creates_get_distinct_ids() {
    let server = start_memory(Mode::Combined).await;

    let ids = create_concurrently(&server.base).await;
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), CLIENTS);

    assert_eq!(
        server.metrics.counter_value(
            "store_operations_total",
            &[("kind", "create"), ("name", "create"), ("success", "true")]
        ),
        Some(CLIENTS as u64)
    );

    server.shutdown().await;
}
