#![allow(clippy::unwrap_used)]
// Integration tests for `StoreClient` using wiremock.

use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skillbridge_api::{Error, Filter, Order, Query, StoreClient};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, PartialEq)]
struct Opportunity {
    id: String,
    title: String,
    created_at: String,
}

async fn setup() -> (MockServer, StoreClient) {
    let server = MockServer::start().await;
    let client = StoreClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Fetch tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_renders_filter_order_and_limit() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/opportunities"))
        .and(query_param("select", "*"))
        .and(query_param("category", "eq.gardening"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "opp-1", "title": "Weed the beds", "created_at": "2026-08-01T10:00:00Z" },
            { "id": "opp-2", "title": "Prune roses", "created_at": "2026-07-30T09:00:00Z" }
        ])))
        .mount(&server)
        .await;

    let query = Query::new()
        .filter(Filter::new().eq("category", "gardening"))
        .order(Order::desc("created_at"))
        .limit(10);

    let rows: Vec<Opportunity> = client.fetch("opportunities", &query).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "opp-1");
    assert_eq!(rows[1].title, "Prune roses");
}

#[tokio::test]
async fn fetch_projection() {
    let (server, client) = setup().await;

    #[derive(Deserialize)]
    struct CompletedRef {
        opportunity_id: String,
    }

    Mock::given(method("GET"))
        .and(path("/rest/v1/completions"))
        .and(query_param("select", "opportunity_id"))
        .and(query_param("status", "eq.completed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "opportunity_id": "opp-1" },
            { "opportunity_id": "opp-7" }
        ])))
        .mount(&server)
        .await;

    let query = Query::new()
        .select("opportunity_id")
        .filter(Filter::new().eq("status", "completed"));

    let rows: Vec<CompletedRef> = client.fetch("completions", &query).await.unwrap();
    assert_eq!(rows[1].opportunity_id, "opp-7");
}

#[tokio::test]
async fn fetch_deserialization_error_keeps_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/opportunities"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let result: Result<Vec<Opportunity>, _> =
        client.fetch("opportunities", &Query::new()).await;

    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("<html>")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── Error classification tests ──────────────────────────────────────

#[tokio::test]
async fn server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/opportunities"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let result: Result<Vec<Opportunity>, _> =
        client.fetch("opportunities", &Query::new()).await;
    let err = result.unwrap_err();

    assert!(err.is_transient(), "503 should classify transient: {err:?}");
}

#[tokio::test]
async fn permission_denied_is_permanent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "row-level security policy violation",
            "code": "42501"
        })))
        .mount(&server)
        .await;

    let result: Result<Vec<Opportunity>, _> =
        client.fetch("notifications", &Query::new()).await;
    let err = result.unwrap_err();

    assert!(matches!(err, Error::PermissionDenied { .. }), "got: {err:?}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn conflict_on_duplicate_insert() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/connections"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "duplicate key value violates unique constraint",
            "code": "23505"
        })))
        .mount(&server)
        .await;

    let result: Result<serde_json::Value, _> = client
        .insert("connections", &json!({ "requester_id": "u1", "recipient_id": "u2" }))
        .await;

    assert!(result.unwrap_err().is_conflict());
}

// ── Write tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn insert_returns_stored_representation() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/opportunities"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(json!({ "title": "Fix bikes" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": "opp-9", "title": "Fix bikes", "created_at": "2026-08-25T08:00:00Z" }
        ])))
        .mount(&server)
        .await;

    let row: Opportunity = client
        .insert("opportunities", &json!({ "title": "Fix bikes" }))
        .await
        .unwrap();

    assert_eq!(row.id, "opp-9");
    assert_eq!(row.title, "Fix bikes");
}

#[tokio::test]
async fn update_targets_row_by_key() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("id", "eq.n-3"))
        .and(body_json(json!({ "read": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "n-3", "title": "ignored", "created_at": "2026-08-25T08:00:00Z" }
        ])))
        .mount(&server)
        .await;

    let row: serde_json::Value = client
        .update("notifications", "n-3", &json!({ "read": true }))
        .await
        .unwrap();

    assert_eq!(row["id"], "n-3");
}

#[tokio::test]
async fn update_matching_nothing_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result: Result<serde_json::Value, _> = client
        .update("notifications", "n-gone", &json!({ "read": true }))
        .await;

    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn delete_succeeds_silently() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("id", "eq.n-5"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client.delete("notifications", "n-5").await.unwrap();
}
