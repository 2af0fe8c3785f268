mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse};
use axum::routing::post;
use serde_json::{Value, json};
use uuid::Uuid;

use crosspost::config::PlatformConfig;
use crosspost::models::QueueStatus;
use crosspost::posters::{HttpPoster, PlatformPoster, PostingResult};
use crosspost::processor::QueueProcessor;
use crosspost::store::{MemoryQueueStore, QueueStore};

/// A fake marketplace bridge with one route per kind of reply.
async fn spawn_bridge() -> SocketAddr {
    let app = Router::new()
        .route(
            "/numeric",
            post(|| async {
                (
                    StatusCode::CREATED,
                    Json(json!({ "id": 987654, "url": "https://ebay.test/itm/987654" })),
                )
            }),
        )
        .route(
            "/string",
            post(|| async { Json(json!({ "id": "m-42", "url": "https://mercari.test/m-42" })) }),
        )
        .route("/no-ids", post(|| async { Json(json!({ "ok": true })) }))
        .route("/empty", post(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/html",
            post(|| async { Html("<html><body>Listed!</body></html>") }),
        )
        .route("/bad-gateway", post(|| async { StatusCode::BAD_GATEWAY }))
        .route(
            "/rejected",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "title too long") }),
        )
        .route("/echo", post(echo))
        .route(
            "/hang",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                StatusCode::OK
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Reflects the bearer header as `id` and the posted listing as `url`.
async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string();
    let url = format!(
        "{}/{}/{}",
        body["platform"].as_str().unwrap_or(""),
        body["listing_id"].as_str().unwrap_or(""),
        body["attempt"]
    );
    Json(json!({ "id": auth, "url": url }))
}

fn poster(addr: SocketAddr, path: &str, token: Option<&str>) -> HttpPoster {
    HttpPoster::new(
        "ebay",
        format!("http://{addr}{path}"),
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn ebay_item() -> crosspost::models::QueueItem {
    common::item(Uuid::now_v7(), "ebay", 0, 3)
}

// ── Successful replies ──────────────────────────────────────────

#[tokio::test]
async fn numeric_id_is_kept_as_text() {
    let addr = spawn_bridge().await;

    let result = poster(addr, "/numeric", None).post(&ebay_item()).await.unwrap();

    assert_eq!(
        result,
        PostingResult::success("987654", "https://ebay.test/itm/987654")
    );
}

#[tokio::test]
async fn string_id_and_url_are_returned() {
    let addr = spawn_bridge().await;

    let result = poster(addr, "/string", None).post(&ebay_item()).await.unwrap();

    assert_eq!(
        result,
        PostingResult::success("m-42", "https://mercari.test/m-42")
    );
}

#[tokio::test]
async fn success_without_ids_has_no_external_refs() {
    let addr = spawn_bridge().await;

    for path in ["/no-ids", "/empty"] {
        let result = poster(addr, path, None).post(&ebay_item()).await.unwrap();
        assert_eq!(
            result,
            PostingResult::Success {
                external_post_id: None,
                external_post_url: None,
            },
            "{path}"
        );
    }
}

// ── Failed replies ──────────────────────────────────────────────

#[tokio::test]
async fn non_json_success_body_is_a_failure() {
    let addr = spawn_bridge().await;

    let result = poster(addr, "/html", None).post(&ebay_item()).await.unwrap();

    assert_eq!(
        result,
        PostingResult::failure("ebay returned an unreadable response with status 200")
    );
}

#[tokio::test]
async fn error_status_is_a_failure_with_status() {
    let addr = spawn_bridge().await;

    let result = poster(addr, "/bad-gateway", None)
        .post(&ebay_item())
        .await
        .unwrap();

    assert_eq!(
        result,
        PostingResult::failure("ebay responded with status 502")
    );
}

#[tokio::test]
async fn error_status_carries_response_detail() {
    let addr = spawn_bridge().await;

    let result = poster(addr, "/rejected", None)
        .post(&ebay_item())
        .await
        .unwrap();

    assert_eq!(
        result,
        PostingResult::failure("ebay responded with status 422: title too long")
    );
}

#[tokio::test]
async fn connection_refused_is_a_posting_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = poster(addr, "/numeric", None)
        .post(&ebay_item())
        .await
        .unwrap_err();

    let message = err.message.expect("transport errors carry a message");
    assert!(message.starts_with("ebay request failed"), "{message}");
}

// ── Request shape ───────────────────────────────────────────────

#[tokio::test]
async fn token_is_sent_as_bearer_auth() {
    let addr = spawn_bridge().await;
    let item = ebay_item();

    let result = poster(addr, "/echo", Some("s3cret")).post(&item).await.unwrap();

    assert_eq!(
        result,
        PostingResult::success("Bearer s3cret", format!("ebay/{}/1", item.listing_id))
    );
}

#[tokio::test]
async fn no_token_sends_no_authorization() {
    let addr = spawn_bridge().await;

    let result = poster(addr, "/echo", None).post(&ebay_item()).await.unwrap();

    let PostingResult::Success {
        external_post_id, ..
    } = &result
    else {
        panic!("expected success, got {result:?}");
    };
    assert_eq!(external_post_id.as_deref(), Some("none"));
}

// ── Registry from config ────────────────────────────────────────

#[tokio::test]
async fn build_registry_registers_each_configured_platform() {
    let addr = spawn_bridge().await;
    let mut config = common::test_config();
    config.platforms = vec![
        PlatformConfig {
            key: "mercari".to_string(),
            url: format!("http://{addr}/string"),
            token: None,
        },
        PlatformConfig {
            key: "ebay".to_string(),
            url: format!("http://{addr}/echo"),
            token: Some("s3cret".to_string()),
        },
    ];

    let registry = crosspost::build_registry(&config).unwrap();

    assert_eq!(
        registry.platforms(),
        vec!["ebay".to_string(), "mercari".to_string()]
    );
    let ebay = registry.lookup("ebay").unwrap();
    assert_eq!(ebay.name(), "ebay");
    let result = ebay.post(&ebay_item()).await.unwrap();
    let PostingResult::Success {
        external_post_id, ..
    } = &result
    else {
        panic!("expected success, got {result:?}");
    };
    assert_eq!(external_post_id.as_deref(), Some("Bearer s3cret"));
}

#[tokio::test]
async fn hung_bridge_is_reported_as_processor_timeout() {
    let addr = spawn_bridge().await;
    let mut config = common::test_config();
    config.poster_timeout_secs = 1;
    config.platforms = vec![PlatformConfig {
        key: "ebay".to_string(),
        url: format!("http://{addr}/hang"),
        token: None,
    }];
    let registry = Arc::new(crosspost::build_registry(&config).unwrap());
    let store = Arc::new(MemoryQueueStore::new());
    let processor = QueueProcessor::new(store.clone(), registry, config.processor_options());
    let item = ebay_item();
    let id = item.id;
    store.insert(item).await;

    processor.process_queue(10).await.unwrap();

    let stored = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, QueueStatus::Pending);
    assert_eq!(stored.retry_count, 1);
    let message = stored.error_message.unwrap();
    assert!(message.starts_with("Posting to ebay timed out"), "{message}");
}
