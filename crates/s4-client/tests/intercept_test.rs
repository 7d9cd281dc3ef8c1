//! Offline interception of outbound requests.

use std::sync::Arc;

use s4_client::{HttpRequest, HttpResponse, OfflineFetch, Transport, TransportError};
use s4_core::{UNKNOWN_HASH, offline::ANCHOR_ROUTE};
use s4_harness::{
    PageStack, SimEnv, SimServer,
    fixtures::queue_store,
};
use s4_store::{ChaoticStorage, Fault, FaultOp, MemoryStorage, QUEUE_PLAIN_KEY, SELECTED_TIER_KEY, Storage};
use serde_json::{Value, json};

fn anchor(body: &Value) -> HttpRequest {
    HttpRequest::post_json(ANCHOR_ROUTE, body)
}

#[tokio::test(start_paused = true)]
async fn offline_anchor_is_queued_and_acknowledged() {
    let stack = PageStack::new();
    stack.connectivity.set_online(false);

    let response = stack
        .fetch()
        .fetch(anchor(&json!({ "hash": "deadbeef", "record_type": "X" })))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    let body: Value = response.decode().unwrap();
    assert_eq!(body["status"], "queued_offline");
    assert_eq!(body["record"]["tx_hash"], "OFFLINE_1767225600000");
    assert_eq!(body["record"]["network"], "Queued Offline");

    let queue = stack.queue.load_queue();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].hash, "deadbeef");
    assert_eq!(queue[0].record_type, "X");
    assert_eq!(queue[0].branch, "JOINT");
    assert_eq!(queue[0].timestamp, "2026-01-01T00:00:00.000Z");
    assert!(!queue[0].synced);

    assert!(stack.server.requests().is_empty());
}

#[tokio::test]
async fn data_hash_and_branch_are_captured() {
    let stack = PageStack::new();
    stack.connectivity.set_online(false);

    stack
        .fetch()
        .fetch(anchor(&json!({ "data_hash": "cafe", "record_type": "VAULT_RECORD", "branch": "NAVY" })))
        .await
        .unwrap();

    let queue = stack.queue.load_queue();
    assert_eq!(queue[0].hash, "cafe");
    assert_eq!(queue[0].branch, "NAVY");
}

#[tokio::test]
async fn malformed_body_still_queues_unknown_hash() {
    let stack = PageStack::new();
    stack.connectivity.set_online(false);

    let response =
        stack.fetch().fetch(HttpRequest::post(ANCHOR_ROUTE, "{not json")).await.unwrap();

    assert_eq!(response.status, 200);
    let queue = stack.queue.load_queue();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].hash, UNKNOWN_HASH);
}

#[tokio::test]
async fn missing_body_still_queues_unknown_hash() {
    let stack = PageStack::new();
    stack.connectivity.set_online(false);

    let request = HttpRequest { body: None, ..HttpRequest::get(ANCHOR_ROUTE) };
    stack.fetch().fetch(request).await.unwrap();

    assert_eq!(stack.queue.load_queue()[0].hash, UNKNOWN_HASH);
}

#[tokio::test]
async fn absolute_url_with_query_is_intercepted() {
    let stack = PageStack::new();
    stack.connectivity.set_online(false);

    let request = HttpRequest::post_json(
        "https://s4ledger.test/api/anchor?source=vault",
        &json!({ "hash": "beef" }),
    );
    stack.fetch().fetch(request).await.unwrap();

    assert_eq!(stack.queue.load_queue().len(), 1);
}

#[tokio::test]
async fn online_requests_are_delegated() {
    let stack = PageStack::new();

    let response =
        stack.fetch().fetch(anchor(&json!({ "hash": "deadbeef" }))).await.unwrap();

    assert_eq!(response.decode::<Value>().unwrap()["status"], "anchored");
    assert_eq!(stack.server.requests_to(ANCHOR_ROUTE).len(), 1);
    assert!(stack.queue.load_queue().is_empty());
}

#[tokio::test]
async fn non_anchor_routes_are_not_intercepted() {
    let stack = PageStack::new();
    stack.connectivity.set_online(false);

    let result = stack.fetch().fetch(HttpRequest::post("/api/metrics/performance", "{}")).await;

    assert!(matches!(result, Err(TransportError::Network(_))));
    assert_eq!(stack.server.requests_to("/api/metrics/performance").len(), 1);
    assert!(stack.queue.load_queue().is_empty());
}

#[tokio::test]
async fn non_anchor_routes_get_the_inner_response_unchanged() {
    let stack = PageStack::new();
    stack.server.respond("/api/metrics/performance", HttpResponse::new(204));
    stack.connectivity.set_online(false);

    let response = stack.fetch().fetch(HttpRequest::get("/api/metrics/performance")).await.unwrap();

    assert_eq!(response, HttpResponse::new(204));
}

#[tokio::test]
async fn offline_provision_uses_cached_tier() {
    let stack = PageStack::new();
    stack.storage.set(SELECTED_TIER_KEY, "enterprise").unwrap();
    stack.connectivity.set_online(false);

    let response = stack.fetch().fetch(HttpRequest::post("/api/demo/provision", "{}")).await.unwrap();

    assert_eq!(response.status, 200);
    let body: Value = response.decode().unwrap();
    assert_eq!(body["subscription"]["tier"], "enterprise");
    assert_eq!(body["wallet"]["address"], "rS4LedgerOfflineDemoWa11et000000");
    assert_eq!(body["wallet"]["xrp_balance"], 25.0);
    assert!(stack.server.requests().is_empty());
}

#[tokio::test]
async fn offline_provision_without_tier_is_deterministic() {
    let stack = PageStack::new();
    stack.connectivity.set_online(false);

    let fetch = stack.fetch();
    let first = fetch.fetch(HttpRequest::post("/api/demo/provision", "{}")).await.unwrap();
    let second = fetch.fetch(HttpRequest::post("/api/demo/provision", "{}")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.decode::<Value>().unwrap()["subscription"]["tier"], "pilot");
}

#[tokio::test]
async fn unqueueable_anchor_fails_instead_of_pretending() {
    let storage = ChaoticStorage::targeted(MemoryStorage::new());
    storage.inject(Fault::always(FaultOp::Set, QUEUE_PLAIN_KEY));
    let queue = queue_store(storage, SimEnv::new());
    let connectivity = s4_client::Connectivity::new(false);

    let fetch = OfflineFetch::new(SimServer::ledger(), Arc::clone(&queue), connectivity);
    let result = fetch.send(anchor(&json!({ "hash": "deadbeef" }))).await;

    assert!(matches!(result, Err(TransportError::Network(_))));
}
