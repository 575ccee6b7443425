// ── Home board ──
//
// The landing view's data: active opportunities plus the recent
// community activity feed. Three seeds run in parallel; the third
// (completions) never materializes as its own snapshot — it only
// drives the opportunity collection's exclusion set, so an opportunity
// with a `completed` completion disappears from the board no matter
// which feed's event lands first.

use std::sync::atomic::{AtomicBool, Ordering};

use skillbridge_api::{ChangeEvent, ChangeKind, Filter, Order, Query, RealtimeClient, StoreClient};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{Activity, Completion, CompletionStatus, Entity, Opportunity};
use crate::retry::RetryPolicy;
use crate::sync::{CollectionOptions, SyncedCollection};

/// The activity feed shows only the newest entries.
pub const ACTIVITY_FEED_LIMIT: usize = 10;

pub struct HomeBoard {
    opportunities: SyncedCollection<Opportunity>,
    activities: SyncedCollection<Activity>,
    store: StoreClient,
    realtime: RealtimeClient,
    retry: RetryPolicy,
    completions_feed: AtomicBool,
    cancel: CancellationToken,
}

impl HomeBoard {
    pub fn new(store: StoreClient, realtime: RealtimeClient) -> Self {
        let opportunities = SyncedCollection::new(
            store.clone(),
            realtime.clone(),
            Query::new().order(Order::desc("created_at")),
            CollectionOptions::default(),
        );
        let activities = SyncedCollection::new(
            store.clone(),
            realtime.clone(),
            Query::new()
                .order(Order::desc("created_at"))
                .limit(ACTIVITY_FEED_LIMIT as u32),
            CollectionOptions::default().with_max_len(ACTIVITY_FEED_LIMIT),
        );

        Self {
            opportunities,
            activities,
            store,
            realtime,
            retry: RetryPolicy::default(),
            completions_feed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Seed all three resources in parallel and open their feeds.
    pub async fn init(&self) -> Result<(), CoreError> {
        let (opportunities, activities, completions) = tokio::join!(
            self.opportunities.init(),
            self.activities.init(),
            self.init_completions(),
        );
        opportunities?;
        activities?;
        completions?;

        info!(
            opportunities = self.opportunities.len(),
            activities = self.activities.len(),
            "home board seeded"
        );
        Ok(())
    }

    /// Re-pull everything without touching the feed subscriptions.
    pub async fn resync(&self) -> Result<(), CoreError> {
        let (opportunities, activities, completions) = tokio::join!(
            self.opportunities.resync(),
            self.activities.resync(),
            self.seed_completions(),
        );
        opportunities?;
        activities?;
        completions?;
        Ok(())
    }

    /// Release every subscription. Idempotent.
    pub fn teardown(&self) {
        self.cancel.cancel();
        self.opportunities.teardown();
        self.activities.teardown();
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn opportunities(&self) -> &SyncedCollection<Opportunity> {
        &self.opportunities
    }

    pub fn activities(&self) -> &SyncedCollection<Activity> {
        &self.activities
    }

    // ── Completion wiring ────────────────────────────────────────────

    /// Seed the exclusion set, then keep it current from the
    /// completions feed.
    ///
    /// The feed is opened at most once per board: a retried `init`
    /// after a sibling seed failure re-seeds but reuses the open
    /// subscription instead of stacking a second pump.
    async fn init_completions(&self) -> Result<(), CoreError> {
        self.seed_completions().await?;

        if self.completions_feed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let subscription = match self.realtime.subscribe(Completion::RESOURCE, None).await {
            Ok(subscription) => subscription,
            Err(err) => {
                self.completions_feed.store(false, Ordering::SeqCst);
                return Err(CoreError::from(err));
            }
        };

        let opportunities = self.opportunities.clone();
        let cancel = self.cancel.clone();
        let mut subscription = subscription;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = subscription.recv() => {
                        let Some(event) = event else { break };
                        apply_completion_event(&opportunities, &event);
                    }
                }
            }
            subscription.unsubscribe();
        });

        Ok(())
    }

    async fn seed_completions(&self) -> Result<(), CoreError> {
        let query = Query::new().filter(
            Filter::new().eq("status", CompletionStatus::Completed.to_string()),
        );
        let completed: Vec<Completion> = self
            .retry
            .run(|| async {
                self.store
                    .fetch(Completion::RESOURCE, &query)
                    .await
                    .map_err(CoreError::from)
            })
            .await?;

        for completion in &completed {
            self.opportunities.exclude(&completion.opportunity_id);
        }
        Ok(())
    }
}

/// Translate a completions-feed event into an exclusion-set change on
/// the opportunities collection.
fn apply_completion_event(opportunities: &SyncedCollection<Opportunity>, event: &ChangeEvent) {
    match event.kind {
        ChangeKind::Insert | ChangeKind::Update => {
            let Some(completion) = event.decode::<Completion>() else {
                debug!("ignoring undecodable completion row");
                return;
            };
            if completion.status == CompletionStatus::Completed {
                opportunities.exclude(&completion.opportunity_id);
            } else {
                opportunities.readmit(&completion.opportunity_id);
            }
        }
        ChangeKind::Delete => {
            // Only the old row is present on deletes.
            if let Ok(old) = serde_json::from_value::<Completion>(event.old_record.clone()) {
                opportunities.readmit(&old.opportunity_id);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use serde_json::json;
    use skillbridge_api::{ReconnectConfig, TransportConfig};
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn offline_realtime(cancel: CancellationToken) -> RealtimeClient {
        RealtimeClient::connect(
            Url::parse("ws://127.0.0.1:9/realtime").unwrap(),
            ReconnectConfig::default(),
            cancel,
        )
    }

    fn opportunities() -> SyncedCollection<Opportunity> {
        let store = StoreClient::from_api_key(
            "http://127.0.0.1:9/",
            &SecretString::from("test-key"),
            &TransportConfig::default(),
        )
        .unwrap();
        let realtime = offline_realtime(CancellationToken::new());
        SyncedCollection::new(store, realtime, Query::new(), CollectionOptions::default())
    }

    /// Store with an empty completions resource, for feed-lifecycle
    /// tests that only care about the subscription side.
    async fn completions_store() -> (MockServer, StoreClient) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let store = StoreClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
        (server, store)
    }

    fn opportunity_insert(id: &str) -> ChangeEvent {
        serde_json::from_value(json!({
            "type": "INSERT",
            "record": {
                "id": id,
                "title": "Teach knitting",
                "created_at": "2026-08-20T12:00:00Z"
            }
        }))
        .unwrap()
    }

    fn completion_event(kind: &str, opportunity_id: &str, status: &str) -> ChangeEvent {
        let row = json!({
            "id": format!("c-{opportunity_id}"),
            "opportunity_id": opportunity_id,
            "status": status,
            "created_at": "2026-08-21T09:00:00Z"
        });
        let body = if kind == "DELETE" {
            json!({ "type": kind, "old_record": row })
        } else {
            json!({ "type": kind, "record": row })
        };
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn completed_completion_removes_its_opportunity() {
        let opps = opportunities();
        opps.apply_event(&opportunity_insert("opp-1"));
        opps.apply_event(&opportunity_insert("opp-2"));

        apply_completion_event(&opps, &completion_event("INSERT", "opp-1", "completed"));

        let snap = opps.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].id, "opp-2");
    }

    #[tokio::test]
    async fn completion_arriving_before_the_opportunity_still_wins() {
        let opps = opportunities();
        apply_completion_event(&opps, &completion_event("INSERT", "opp-1", "completed"));

        opps.apply_event(&opportunity_insert("opp-1"));
        assert!(opps.is_empty());
    }

    #[tokio::test]
    async fn pending_completion_does_not_exclude() {
        let opps = opportunities();
        opps.apply_event(&opportunity_insert("opp-1"));

        apply_completion_event(&opps, &completion_event("INSERT", "opp-1", "pending"));
        assert_eq!(opps.len(), 1);
    }

    #[tokio::test]
    async fn reinit_reuses_the_open_completions_feed() {
        let (_server, store) = completions_store().await;
        let realtime_cancel = CancellationToken::new();
        let board = HomeBoard::new(store, offline_realtime(realtime_cancel.clone()));

        board.init_completions().await.unwrap();
        assert!(board.completions_feed.load(Ordering::SeqCst));

        // Kill the realtime loop: a second subscribe attempt would now
        // fail, so success here means the open feed was reused.
        realtime_cancel.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;

        board.init_completions().await.unwrap();
        assert!(board.completions_feed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_feed_subscribe_clears_the_guard() {
        let (_server, store) = completions_store().await;
        let realtime_cancel = CancellationToken::new();
        let realtime = offline_realtime(realtime_cancel.clone());
        realtime_cancel.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let board = HomeBoard::new(store, realtime);
        assert!(board.init_completions().await.is_err());
        assert!(!board.completions_feed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn completion_delete_lifts_the_exclusion() {
        let opps = opportunities();
        apply_completion_event(&opps, &completion_event("INSERT", "opp-1", "completed"));
        apply_completion_event(&opps, &completion_event("DELETE", "opp-1", "completed"));

        opps.apply_event(&opportunity_insert("opp-1"));
        assert_eq!(opps.len(), 1);
    }
}
