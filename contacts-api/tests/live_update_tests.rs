//! Integration tests for live contact updates
//!
//! Tests cover:
//! - Change relay broadcasting after mutations, including bursts
//! - Relay surviving a failed cycle and stopping on cancellation
//! - Pruning of closed subscribers
//! - Cross-instance delivery through the shared SQLite change channel
//! - SSE endpoint framing, follow-up pushes and shutdown
//! - Publish timeout never blocking a mutation

mod helpers;

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use contacts_api::live::{ChangeRelay, RelayHandle, Subscriber, SubscriberFeed, SubscriberRegistry};
use contacts_api::services::{ChangePublisher, ContactService, HistoryRecorder};
use contacts_api::AppState;
use contacts_common::channel::{ChangeChannel, ChangeSubscription, SqliteChannel, CONTACT_CHANGES};
use futures::StreamExt;
use helpers::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

const POLL: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(5);

async fn spawn_relay(ctx: &TestContext) -> RelayHandle {
    ChangeRelay::new(ctx.pool.clone(), ctx.channel.clone(), ctx.registry.clone(), POLL)
        .spawn(ctx.shutdown.child_token())
        .await
        .expect("Relay should start")
}

/// Register a subscriber directly and consume its admission snapshot
fn subscribe(registry: &SubscriberRegistry) -> SubscriberFeed {
    let (subscriber, mut feed) = Subscriber::channel();
    assert!(registry.connect(subscriber, Arc::from("[]")));
    feed.borrow_and_update();
    feed
}

/// Wait for the next pushed snapshot and parse it
async fn next_snapshot(feed: &mut SubscriberFeed) -> Vec<Value> {
    timeout(WAIT, feed.changed())
        .await
        .expect("Timed out waiting for snapshot")
        .expect("Feed closed");
    let payload = feed.borrow_and_update().clone();
    serde_json::from_str(&payload).expect("Snapshot should be a JSON array")
}

/// Wait until a pushed snapshot satisfies `accept`
async fn snapshot_where<F>(feed: &mut SubscriberFeed, accept: F) -> Vec<Value>
where
    F: Fn(&[Value]) -> bool,
{
    loop {
        let snapshot = next_snapshot(feed).await;
        if accept(&snapshot) {
            return snapshot;
        }
    }
}

fn emails(snapshot: &[Value]) -> Vec<String> {
    snapshot
        .iter()
        .map(|c| c["email"].as_str().unwrap_or_default().to_string())
        .collect()
}

// =============================================================================
// Change relay
// =============================================================================

#[tokio::test]
async fn test_relay_broadcasts_after_create() {
    let ctx = setup().await;
    let relay = spawn_relay(&ctx).await;
    let mut feed = subscribe(&ctx.registry);

    let created = create(&ctx.router(), "Ada", "ada@example.com").await;

    let snapshot = next_snapshot(&mut feed).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0]["id"], created["id"]);
    assert_eq!(snapshot[0]["email"], "ada@example.com");
    assert!(snapshot[0]["created_at"].is_string());

    relay.shutdown().await;
}

#[tokio::test]
async fn test_relay_converges_after_burst() {
    let ctx = setup().await;
    let relay = spawn_relay(&ctx).await;
    let mut feed = subscribe(&ctx.registry);
    let app = ctx.router();

    for i in 0..5 {
        create(&app, &format!("Burst{}", i), &format!("burst{}@example.com", i)).await;
    }

    let snapshot = snapshot_where(&mut feed, |s| s.len() == 5).await;
    assert_eq!(
        emails(&snapshot),
        vec![
            "burst4@example.com",
            "burst3@example.com",
            "burst2@example.com",
            "burst1@example.com",
            "burst0@example.com",
        ]
    );

    relay.shutdown().await;
}

#[tokio::test]
async fn test_relay_broadcasts_after_delete() {
    let ctx = setup().await;
    let app = ctx.router();
    let created = create(&app, "Gone", "gone@example.com").await;

    let relay = spawn_relay(&ctx).await;
    let mut feed = subscribe(&ctx.registry);

    let id = created["id"].as_i64().unwrap();
    let (status, _) = send(&app, test_request("DELETE", &format!("/contacts/{}", id), None)).await;
    assert_eq!(status, StatusCode::OK);

    let snapshot = next_snapshot(&mut feed).await;
    assert!(snapshot.is_empty());

    relay.shutdown().await;
}

#[tokio::test]
async fn test_relay_survives_failed_cycle() {
    let ctx = setup().await;
    let relay = spawn_relay(&ctx).await;
    let mut feed = subscribe(&ctx.registry);

    sqlx::query("ALTER TABLE contacts RENAME TO contacts_offline")
        .execute(&ctx.pool)
        .await
        .unwrap();
    ctx.channel.publish().await.unwrap();

    // Several poll intervals with a failing re-read
    tokio::time::sleep(POLL * 5).await;
    assert!(!relay.is_finished());
    assert!(!feed.has_changed().unwrap());

    sqlx::query("ALTER TABLE contacts_offline RENAME TO contacts")
        .execute(&ctx.pool)
        .await
        .unwrap();

    create(&ctx.router(), "Back", "back@example.com").await;

    let snapshot = snapshot_where(&mut feed, |s| s.len() == 1).await;
    assert_eq!(snapshot[0]["email"], "back@example.com");

    relay.shutdown().await;
}

#[tokio::test]
async fn test_relay_shutdown_completes() {
    let ctx = setup().await;
    let relay = spawn_relay(&ctx).await;

    timeout(WAIT, relay.shutdown())
        .await
        .expect("Relay should stop promptly after cancellation");
}

#[tokio::test]
async fn test_relay_stops_on_parent_token() {
    let ctx = setup().await;
    let relay = spawn_relay(&ctx).await;

    ctx.shutdown.cancel();

    timeout(WAIT, async {
        while !relay.is_finished() {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("Relay should observe parent cancellation");
}

#[tokio::test]
async fn test_closed_subscriber_pruned_while_others_receive() {
    let ctx = setup().await;
    let relay = spawn_relay(&ctx).await;

    let mut alive = subscribe(&ctx.registry);
    let closed = subscribe(&ctx.registry);
    assert_eq!(ctx.registry.len(), 2);
    drop(closed);

    create(&ctx.router(), "Ada", "ada@example.com").await;

    let snapshot = next_snapshot(&mut alive).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(ctx.registry.len(), 1);

    relay.shutdown().await;
}

#[tokio::test]
async fn test_cross_instance_delivery_through_sqlite_channel() {
    // Change signals travel through their own shared file
    let channel_dir = tempfile::TempDir::new().unwrap();
    let shared_url = format!("sqlite://{}", channel_dir.path().join("signals.db").display());
    let channel_a: Arc<dyn ChangeChannel> =
        Arc::new(SqliteChannel::connect(&shared_url, CONTACT_CHANGES).await.unwrap());
    let ctx_a = setup_with_channel(channel_a).await;

    // Second instance: own channel connection and registry, same record store
    let pool_b = contacts_common::db::init_database(&ctx_a.db_url).await.unwrap();
    let channel_b: Arc<dyn ChangeChannel> =
        Arc::new(SqliteChannel::connect(&shared_url, CONTACT_CHANGES).await.unwrap());
    let registry_b = SubscriberRegistry::new();
    let shutdown_b = CancellationToken::new();
    let relay_b = ChangeRelay::new(pool_b, channel_b.clone(), registry_b.clone(), POLL)
        .spawn(shutdown_b.clone())
        .await
        .unwrap();
    let mut feed_b = subscribe(&registry_b);

    create(&ctx_a.router(), "Remote", "remote@example.com").await;

    let snapshot = next_snapshot(&mut feed_b).await;
    assert_eq!(emails(&snapshot), vec!["remote@example.com"]);

    relay_b.shutdown().await;
    channel_b.close().await;
}

// =============================================================================
// SSE endpoint
// =============================================================================

/// Read body frames until one carries an SSE `data:` line, return that frame
async fn next_event<S>(body: &mut S) -> String
where
    S: futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
{
    loop {
        let frame = timeout(WAIT, body.next())
            .await
            .expect("Timed out waiting for SSE frame")
            .expect("SSE stream ended")
            .expect("SSE frame error");
        let text = String::from_utf8_lossy(&frame).into_owned();
        if text.contains("data:") {
            return text;
        }
    }
}

fn event_name(frame: &str) -> Option<&str> {
    frame
        .lines()
        .find_map(|line| line.strip_prefix("event:"))
        .map(str::trim)
}

fn event_data(frame: &str) -> Value {
    let data = frame
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .expect("Frame should carry data");
    serde_json::from_str(data.trim()).expect("Event data should be JSON")
}

#[tokio::test]
async fn test_sse_sends_current_list_then_updates() {
    let ctx = setup().await;
    let relay = spawn_relay(&ctx).await;
    let app = ctx.router();
    let first = create(&app, "Ada", "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(test_request("GET", "/contacts/events", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(ctx.registry.len(), 1);

    let mut body = response.into_body().into_data_stream();

    let frame = next_event(&mut body).await;
    assert_eq!(event_name(&frame), Some("contacts"));
    let initial = event_data(&frame);
    assert_eq!(initial.as_array().unwrap().len(), 1);
    assert_eq!(initial[0]["id"], first["id"]);

    create(&app, "Grace", "grace@example.com").await;

    // The relay may still push the pre-connect list first
    let updated = loop {
        let data = event_data(&next_event(&mut body).await);
        if data.as_array().map_or(false, |list| list.len() == 2) {
            break data;
        }
    };
    assert_eq!(
        emails(updated.as_array().unwrap()),
        vec!["grace@example.com", "ada@example.com"]
    );

    drop(body);
    assert!(ctx.registry.is_empty());

    relay.shutdown().await;
}

#[tokio::test]
async fn test_sse_stream_ends_on_shutdown() {
    let ctx = setup().await;

    let response = ctx
        .router()
        .oneshot(test_request("GET", "/contacts/events", None))
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();
    let frame = next_event(&mut body).await;
    assert_eq!(event_data(&frame), serde_json::json!([]));

    ctx.shutdown.cancel();

    let ended = timeout(WAIT, async {
        while let Some(frame) = body.next().await {
            frame.expect("SSE frame error");
        }
    })
    .await;
    assert!(ended.is_ok(), "SSE stream should end after shutdown");
    assert!(ctx.registry.is_empty());
}

// =============================================================================
// Publish timeout
// =============================================================================

/// Channel whose publish never completes
struct HangingChannel;

struct SilentSubscription;

#[async_trait]
impl ChangeSubscription for SilentSubscription {
    async fn poll(&mut self) -> contacts_common::Result<bool> {
        Ok(false)
    }
}

#[async_trait]
impl ChangeChannel for HangingChannel {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn publish(&self) -> contacts_common::Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn subscribe(&self) -> contacts_common::Result<Box<dyn ChangeSubscription>> {
        Ok(Box::new(SilentSubscription))
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn test_hanging_publish_is_bounded() {
    let publisher = ChangePublisher::with_timeout(Arc::new(HangingChannel), Duration::from_millis(50));

    let delivered = timeout(WAIT, publisher.notify_changed())
        .await
        .expect("Publish should be bounded by its timeout");

    assert!(!delivered);
}

#[tokio::test]
async fn test_hanging_channel_does_not_block_create() {
    let ctx = setup().await;
    let service = ContactService::new(
        ctx.pool.clone(),
        HistoryRecorder::new(ctx.pool.clone()),
        ChangePublisher::with_timeout(Arc::new(HangingChannel), Duration::from_millis(50)),
    );

    let contact = timeout(WAIT, service.create(&fields("Ada", "ada@example.com")))
        .await
        .expect("Create should not wait on the channel")
        .expect("Create should succeed");

    assert_eq!(service.get(contact.id).await.unwrap().email, "ada@example.com");
    assert_eq!(history_count(&ctx.pool, contact.id).await, 1);
}

#[tokio::test]
async fn test_state_wires_injected_channel() {
    let ctx = setup().await;
    let registry = SubscriberRegistry::new();
    let state = AppState::new(
        ctx.pool.clone(),
        Arc::new(HangingChannel),
        registry,
        CancellationToken::new(),
    );

    // Default publish timeout still lets the request complete
    let app = contacts_api::build_router(state, None);
    let (status, _) = timeout(
        WAIT,
        send(&app, test_request("POST", "/contacts", Some(contact_body("Ada", "ada@example.com")))),
    )
    .await
    .expect("Request should complete");
    assert_eq!(status, StatusCode::OK);
}
