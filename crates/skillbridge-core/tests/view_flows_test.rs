#![allow(clippy::unwrap_used)]
// End-to-end view flows against a mocked store: home board seeding with
// completion filtering, optimistic chat sends, and notification writes
// with local revert.

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skillbridge_api::{RealtimeClient, ReconnectConfig, StoreClient};
use skillbridge_core::{ChatRoom, CoreError, HomeBoard, NotificationCenter, SyncStatus};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, StoreClient, RealtimeClient) {
    let server = MockServer::start().await;
    let store = StoreClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    // The feed endpoint is unreachable; joins are still acknowledged
    // while the connection loop backs off, which is all these tests need.
    let realtime = RealtimeClient::connect(
        Url::parse("ws://127.0.0.1:1/realtime").unwrap(),
        ReconnectConfig::default(),
        CancellationToken::new(),
    );
    (server, store, realtime)
}

fn opportunity(id: &str, title: &str) -> serde_json::Value {
    json!({ "id": id, "title": title, "created_at": "2026-08-10T10:00:00Z" })
}

// ── Home board ──────────────────────────────────────────────────────

#[tokio::test]
async fn home_board_seed_applies_completion_filtering() {
    let (server, store, realtime) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/opportunities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            opportunity("opp-1", "Weed the beds"),
            opportunity("opp-2", "Teach knitting"),
            opportunity("opp-3", "Fix a bike"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "act-1",
                "user_id": "u-2",
                "action": "applied to",
                "target": "Fix a bike",
                "created_at": "2026-08-11T08:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/completions"))
        .and(query_param("status", "eq.completed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "c-1",
                "opportunity_id": "opp-2",
                "status": "completed",
                "created_at": "2026-08-12T09:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let board = HomeBoard::new(store, realtime);
    board.init().await.unwrap();

    let opportunities = board.opportunities().snapshot();
    let ids: Vec<&str> = opportunities.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["opp-1", "opp-3"]);
    assert!(board.opportunities().status().is_live());

    assert_eq!(board.activities().len(), 1);

    board.teardown();
    assert_eq!(board.opportunities().status(), SyncStatus::TornDown);
}

#[tokio::test]
async fn home_board_seed_failure_retries_then_surfaces_the_error() {
    let (server, store, realtime) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/opportunities"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let board = HomeBoard::new(store, realtime);
    let err = board.init().await.unwrap_err();

    assert!(err.is_transient());
    assert!(board.opportunities().status().is_errored());
    assert!(board.opportunities().is_empty());
}

#[tokio::test]
async fn home_board_reinit_recovers_after_a_failed_seed() {
    let (server, store, realtime) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "c-1",
                "opportunity_id": "opp-2",
                "status": "completed",
                "created_at": "2026-08-12T09:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let board = HomeBoard::new(store, realtime);

    // First init: the opportunities seed is down, the siblings are not.
    {
        let _outage = Mock::given(method("GET"))
            .and(path("/rest/v1/opportunities"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount_as_scoped(&server)
            .await;

        let err = board.init().await.unwrap_err();
        assert!(err.is_transient());
        assert!(board.opportunities().status().is_errored());
    }

    // The store recovers; re-invoking init seeds everything and keeps
    // the completion filtering from the already-open feed wiring.
    Mock::given(method("GET"))
        .and(path("/rest/v1/opportunities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            opportunity("opp-1", "Weed the beds"),
            opportunity("opp-2", "Teach knitting"),
        ])))
        .mount(&server)
        .await;

    board.init().await.unwrap();

    let snapshot = board.opportunities().snapshot();
    let ids: Vec<&str> = snapshot.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["opp-1"]);
    assert!(board.opportunities().status().is_live());

    board.teardown();
}

// ── Chat sends ──────────────────────────────────────────────────────

#[tokio::test]
async fn chat_send_reconciles_the_optimistic_entry() {
    let (server, store, realtime) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .and(body_json(json!({
            "room_id": "room-1",
            "sender_id": "u-1",
            "content": "see you at 5"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "m-42",
            "room_id": "room-1",
            "sender_id": "u-1",
            "content": "see you at 5",
            "created_at": "2026-08-20T17:00:00Z"
        }])))
        .mount(&server)
        .await;

    let room = ChatRoom::new(store, realtime, "room-1", "u-1");
    let confirmed = room.send("see you at 5").await.unwrap();
    assert_eq!(confirmed.id, "m-42");

    let messages = room.messages().snapshot();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "m-42");
}

#[tokio::test]
async fn chat_send_failure_rolls_back_and_is_not_retried() {
    let (server, store, realtime) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "row-level security violation"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let room = ChatRoom::new(store, realtime, "room-1", "u-1");
    let err = room.send("hello?").await.unwrap_err();

    assert!(matches!(err, CoreError::PermissionDenied { .. }));
    assert!(room.messages().is_empty());
}

// ── Notification writes ─────────────────────────────────────────────

fn notification_event(id: &str, read: bool) -> skillbridge_api::ChangeEvent {
    serde_json::from_value(json!({
        "type": "INSERT",
        "record": {
            "id": id,
            "user_id": "u-1",
            "message": "Dana accepted your request",
            "read": read,
            "type": "connection",
            "created_at": "2026-08-19T12:00:00Z"
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn mark_read_patches_locally_and_confirms() {
    let (server, store, realtime) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("id", "eq.n-1"))
        .and(body_json(json!({ "read": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "n-1",
            "user_id": "u-1",
            "message": "Dana accepted your request",
            "read": true,
            "type": "connection",
            "created_at": "2026-08-19T12:00:00Z"
        }])))
        .mount(&server)
        .await;

    let center = NotificationCenter::new(store, realtime, "u-1");
    center.notifications().apply_event(&notification_event("n-1", false));
    assert_eq!(center.unread_count(), 1);

    center.mark_read("n-1").await.unwrap();
    assert_eq!(center.unread_count(), 0);
}

#[tokio::test]
async fn mark_read_rejection_reverts_the_local_row() {
    let (server, store, realtime) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let center = NotificationCenter::new(store, realtime, "u-1");
    center.notifications().apply_event(&notification_event("n-1", false));

    let err = center.mark_read("n-1").await.unwrap_err();
    assert!(err.is_transient());
    // The optimistic flip was undone.
    assert_eq!(center.unread_count(), 1);
}

#[tokio::test]
async fn dismiss_failure_restores_the_row() {
    let (server, store, realtime) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let center = NotificationCenter::new(store, realtime, "u-1");
    center.notifications().apply_event(&notification_event("n-1", true));

    center.dismiss("n-1").await.unwrap_err();
    assert_eq!(center.notifications().len(), 1);
}
