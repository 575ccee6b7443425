// ── Debounced search ──
//
// A search box owns one logical in-flight query. Keystrokes arm a
// quiet-period timer; only the last input before the timer fires is
// queried, and a response that lands after a newer keystroke is
// discarded. There is no hard cancellation of the network call, only
// suppression of its effect — the generation counter decides.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_core::future::BoxFuture;
use skillbridge_api::{Filter, Query, StoreClient};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Connection, ConnectionStatus, NewConnection, Profile};

/// Keystrokes closer together than this coalesce into one query.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Inputs shorter than this clear the results instead of querying.
pub const MIN_QUERY_CHARS: usize = 2;

/// People search returns at most this many rows.
pub const SEARCH_RESULT_LIMIT: u32 = 5;

type QueryRunner<R> =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<Vec<R>, CoreError>> + Send + Sync>;

// ── SearchDebouncer ──────────────────────────────────────────────────

/// Coalesces rapid input changes into one delayed remote query and
/// suppresses superseded responses.
pub struct SearchDebouncer<R: Clone + Send + Sync + 'static> {
    runner: QueryRunner<R>,
    quiet_period: Duration,
    min_chars: usize,
    /// Bumped on every input change; a timer or response carrying a
    /// stale generation is a no-op.
    generation: Arc<AtomicU64>,
    results: Arc<watch::Sender<Arc<Vec<R>>>>,
    searching: Arc<watch::Sender<bool>>,
    error: Arc<watch::Sender<Option<String>>>,
}

impl<R: Clone + Send + Sync + 'static> SearchDebouncer<R> {
    pub fn new(runner: QueryRunner<R>) -> Self {
        let (results, _) = watch::channel(Arc::new(Vec::new()));
        let (searching, _) = watch::channel(false);
        let (error, _) = watch::channel(None);

        Self {
            runner,
            quiet_period: QUIET_PERIOD,
            min_chars: MIN_QUERY_CHARS,
            generation: Arc::new(AtomicU64::new(0)),
            results: Arc::new(results),
            searching: Arc::new(searching),
            error: Arc::new(error),
        }
    }

    #[cfg(test)]
    fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    // ── Input ────────────────────────────────────────────────────────

    /// Feed one input change. Below the minimum length the results are
    /// cleared immediately; otherwise a query is armed for the quiet
    /// period.
    pub fn input(&self, text: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let term = text.trim().to_owned();

        if term.chars().count() < self.min_chars {
            self.results.send_modify(|r| *r = Arc::new(Vec::new()));
            self.searching.send_modify(|s| *s = false);
            self.error.send_modify(|e| *e = None);
            return;
        }

        let runner = Arc::clone(&self.runner);
        let quiet_period = self.quiet_period;
        let current = Arc::clone(&self.generation);
        let results = Arc::clone(&self.results);
        let searching = Arc::clone(&self.searching);
        let error = Arc::clone(&self.error);

        tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }

            searching.send_modify(|s| *s = true);
            let outcome = runner(term.clone()).await;

            // A newer keystroke landed while the query ran; its own
            // task owns the watch channels now.
            if current.load(Ordering::SeqCst) != generation {
                debug!(%term, "discarding stale search response");
                return;
            }

            match outcome {
                Ok(rows) => {
                    results.send_modify(|r| *r = Arc::new(rows));
                    error.send_modify(|e| *e = None);
                }
                Err(err) => {
                    warn!(%term, error = %err, "search query failed");
                    error.send_modify(|e| *e = Some(err.to_string()));
                }
            }
            searching.send_modify(|s| *s = false);
        });
    }

    /// Clear results and suppress any in-flight response.
    pub fn reset(&self) {
        self.input("");
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn results(&self) -> Arc<Vec<R>> {
        self.results.borrow().clone()
    }

    pub fn watch_results(&self) -> watch::Receiver<Arc<Vec<R>>> {
        self.results.subscribe()
    }

    pub fn is_searching(&self) -> bool {
        *self.searching.borrow()
    }

    pub fn last_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }
}

// ── People search ────────────────────────────────────────────────────

/// One people-search hit: the profile plus the caller's relationship
/// to it, if any.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PersonMatch {
    pub profile: Profile,
    pub connection: Option<ConnectionStatus>,
}

/// Name search over member profiles, excluding the searcher, annotated
/// with existing connection state.
pub struct UserSearch {
    store: StoreClient,
    user_id: String,
    debouncer: SearchDebouncer<PersonMatch>,
}

impl UserSearch {
    pub fn new(store: StoreClient, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let runner_store = store.clone();
        let runner_user = user_id.clone();
        let runner: QueryRunner<PersonMatch> = Arc::new(move |term| {
            let store = runner_store.clone();
            let me = runner_user.clone();
            Box::pin(async move { search_people(&store, &me, &term).await })
        });

        Self {
            store,
            user_id,
            debouncer: SearchDebouncer::new(runner),
        }
    }

    pub fn input(&self, text: &str) {
        self.debouncer.input(text);
    }

    pub fn reset(&self) {
        self.debouncer.reset();
    }

    pub fn results(&self) -> Arc<Vec<PersonMatch>> {
        self.debouncer.results()
    }

    pub fn watch_results(&self) -> watch::Receiver<Arc<Vec<PersonMatch>>> {
        self.debouncer.watch_results()
    }

    pub fn is_searching(&self) -> bool {
        self.debouncer.is_searching()
    }

    pub fn last_error(&self) -> Option<String> {
        self.debouncer.last_error()
    }

    /// Run one query immediately, bypassing the debounce. For
    /// non-interactive callers that already have the final term.
    pub async fn search_now(&self, term: &str) -> Result<Vec<PersonMatch>, CoreError> {
        let term = term.trim();
        if term.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }
        search_people(&self.store, &self.user_id, term).await
    }

    /// Send a connection request. Never retried: a duplicated request
    /// shows up as a store conflict, not a silent double-add.
    pub async fn request_connection(&self, recipient_id: &str) -> Result<Connection, CoreError> {
        let body = NewConnection {
            requester_id: self.user_id.clone(),
            recipient_id: recipient_id.to_owned(),
        };
        let connection = self
            .store
            .insert::<Connection, _>("connections", &body)
            .await?;
        Ok(connection)
    }
}

/// The actual remote query: matching profiles, then the searcher's
/// connection edges, merged by peer id.
async fn search_people(
    store: &StoreClient,
    me: &str,
    term: &str,
) -> Result<Vec<PersonMatch>, CoreError> {
    let profiles_query = Query::new()
        .filter(
            Filter::new()
                .neq("id", me)
                .ilike("name", format!("%{term}%")),
        )
        .limit(SEARCH_RESULT_LIMIT);

    // The filter grammar is conjunctive, so the two directions of the
    // connection edge take two fetches.
    let (profiles, sent, received) = tokio::join!(
        store.fetch::<Profile>("profiles", &profiles_query),
        store.fetch_filtered::<Connection>("connections", Filter::new().eq("requester_id", me)),
        store.fetch_filtered::<Connection>("connections", Filter::new().eq("recipient_id", me)),
    );
    let profiles = profiles?;
    let edges: Vec<Connection> = sent?.into_iter().chain(received?).collect();

    Ok(profiles
        .into_iter()
        .map(|profile| {
            let connection = edges
                .iter()
                .find(|e| e.involves(&profile.id))
                .map(|e| e.status);
            PersonMatch {
                profile,
                connection,
            }
        })
        .collect())
}
