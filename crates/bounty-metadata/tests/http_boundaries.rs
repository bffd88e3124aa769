//! HTTP clients against a loopback storage node and metadata service

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bounty_core::{Address, BlobStore, BountyDocument, BountyForm, ErrorKind, MetadataSource, PersistenceOptions};
use bounty_metadata::{CodexBlobStore, HttpMetadataSource, MetadataCache, MetadataUploader};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

#[derive(Default)]
struct Node {
    local: Mutex<HashMap<String, Vec<u8>>>,
    network: Mutex<HashMap<String, Vec<u8>>>,
    metadata_hits: AtomicUsize,
    stream_hits: AtomicUsize,
    persistence_hits: AtomicUsize,
}

#[derive(Deserialize)]
struct CidQuery {
    cid: String,
}

async fn metadata(State(node): State<Arc<Node>>, Query(query): Query<CidQuery>) -> (StatusCode, Json<Value>) {
    node.metadata_hits.fetch_add(1, Ordering::SeqCst);
    match query.cid.as_str() {
        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "upstream down" }))),
        "refused" => (
            StatusCode::OK,
            Json(json!({ "success": false, "error": "Failed to fetch metadata" })),
        ),
        cid => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "cid": cid,
                "data": { "title": "Harden the relayer", "description": "Fuzz it", "tags": ["security"] }
            })),
        ),
    }
}

async fn put_data(State(node): State<Arc<Node>>, body: Bytes) -> (StatusCode, String) {
    let cid = format!("zDv{}", body.len());
    node.local.lock().await.insert(cid.clone(), body.to_vec());
    (StatusCode::OK, format!("{}\n", cid))
}

async fn get_local(State(node): State<Arc<Node>>, Path(cid): Path<String>) -> (StatusCode, Vec<u8>) {
    match cid.as_str() {
        "flaky" => (StatusCode::SERVICE_UNAVAILABLE, Vec::new()),
        _ => match node.local.lock().await.get(&cid) {
            Some(bytes) => (StatusCode::OK, bytes.clone()),
            None => (StatusCode::NOT_FOUND, Vec::new()),
        },
    }
}

async fn get_network(State(node): State<Arc<Node>>, Path(cid): Path<String>) -> (StatusCode, Vec<u8>) {
    node.stream_hits.fetch_add(1, Ordering::SeqCst);
    match node.network.lock().await.get(&cid) {
        Some(bytes) => (StatusCode::OK, bytes.clone()),
        None => (StatusCode::NOT_FOUND, Vec::new()),
    }
}

async fn request_persistence(State(node): State<Arc<Node>>, Path(_cid): Path<String>) -> (StatusCode, String) {
    node.persistence_hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, "no hosts available".to_string())
}

async fn serve(node: Arc<Node>) -> String {
    let app = Router::new()
        .route("/metadata", get(metadata))
        .route("/data", post(put_data))
        .route("/data/{cid}", get(get_local))
        .route("/data/{cid}/network/stream", get(get_network))
        .route("/storage/request/{cid}", post(request_persistence))
        .with_state(node);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn metadata_source(base: &str) -> Arc<HttpMetadataSource> {
    Arc::new(HttpMetadataSource::new(base, Duration::from_secs(5)).unwrap())
}

fn codex(base: &str) -> CodexBlobStore {
    CodexBlobStore::new(format!("{}/", base), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_metadata_success_is_parsed() {
    let base = serve(Arc::new(Node::default())).await;
    let source = metadata_source(&base);

    let response = source.resolve("bafy1").await.unwrap();
    assert!(response.success);
    assert_eq!(response.cid.as_deref(), Some("bafy1"));

    let cache = MetadataCache::new(source);
    let metadata = cache.fetch("bafy1").await.unwrap();
    assert_eq!(metadata.title, "Harden the relayer");
    assert_eq!(metadata.tags, vec!["security"]);
}

#[tokio::test]
async fn test_metadata_server_error_is_err_and_cached_as_none() {
    let node = Arc::new(Node::default());
    let base = serve(node.clone()).await;
    let source = metadata_source(&base);

    let err = source.resolve("boom").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.to_string().contains("500"));

    let cache = MetadataCache::new(source);
    assert!(cache.fetch("boom").await.is_none());
    assert!(cache.fetch("boom").await.is_none());
    assert_eq!(cache.peek("boom").await, Some(None));
    // One direct resolve plus one cache miss; the second fetch is served from the cache.
    assert_eq!(node.metadata_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_metadata_unsuccessful_body_becomes_none() {
    let base = serve(Arc::new(Node::default())).await;
    let source = metadata_source(&base);

    let response = source.resolve("refused").await.unwrap();
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Failed to fetch metadata"));

    let cache = MetadataCache::new(source);
    assert!(cache.fetch("refused").await.is_none());
    assert_eq!(cache.peek("refused").await, Some(None));
}

#[tokio::test]
async fn test_unreachable_metadata_service_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = metadata_source(&format!("http://{}", addr));
    let err = source.resolve("bafy1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_codex_put_then_local_read() {
    let node = Arc::new(Node::default());
    let store = codex(&serve(node.clone()).await);

    let cid = store
        .put(b"{\"title\":\"x\"}".to_vec(), "application/json", "b.json")
        .await
        .unwrap();
    assert_eq!(cid, "zDv13");

    assert_eq!(store.get(&cid).await.unwrap().unwrap(), b"{\"title\":\"x\"}".to_vec());
    assert_eq!(node.stream_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_codex_falls_back_to_network_stream() {
    let node = Arc::new(Node::default());
    node.network
        .lock()
        .await
        .insert("remote".to_string(), b"from peers".to_vec());
    node.network
        .lock()
        .await
        .insert("flaky".to_string(), b"retried".to_vec());
    let store = codex(&serve(node.clone()).await);

    assert_eq!(store.get("remote").await.unwrap().unwrap(), b"from peers".to_vec());
    // A local 5xx is logged and the network copy still served.
    assert_eq!(store.get("flaky").await.unwrap().unwrap(), b"retried".to_vec());
    assert!(store.get("nowhere").await.unwrap().is_none());
    assert_eq!(node.stream_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_persistence_keeps_upload() {
    let node = Arc::new(Node::default());
    let store = Arc::new(codex(&serve(node.clone()).await));

    let err = store
        .request_persistence("zDv1", &PersistenceOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.to_string().contains("no hosts available"));

    let uploader = MetadataUploader::new(store).with_persistence(PersistenceOptions::default());
    let form = BountyForm {
        title: "Harden the relayer".to_string(),
        description: "Fuzz it".to_string(),
        reward: "40".to_string(),
        deadline: "2030-01-01".to_string(),
        tags: vec![],
    };
    let document = BountyDocument::from_form(
        &form,
        Some(&Address::new("0x00000000000000000000000000000000000000aa")),
        "Bountyboard",
        "Base",
        Utc::now(),
    );

    let cid = uploader.upload_bounty(&document).await.unwrap();
    assert_eq!(node.persistence_hits.load(Ordering::SeqCst), 2);
    assert_eq!(uploader.retrieve_bounty(&cid).await.unwrap()["title"], "Harden the relayer");
}
