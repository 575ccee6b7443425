//! Realtime change feed over a websocket, with auto-reconnect.
//!
//! Connects to the backend's realtime endpoint and streams row-change
//! events ([`ChangeEvent`]) per subscribed resource through
//! [`tokio::sync::broadcast`] channels. One connection serves every
//! subscription; topics are re-joined automatically after a reconnect.
//!
//! Delivery is at-least-once and best-effort ordered per topic. A
//! reconnect can silently drop events that occurred while the connection
//! was down — consumers that need a coherent view must pair the feed
//! with an explicit re-fetch.
//!
//! # Example
//!
//! ```rust,ignore
//! use skillbridge_api::{RealtimeClient, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("wss://backend.example.com/realtime/v1/websocket")?;
//!
//! let client = RealtimeClient::connect(ws_url, ReconnectConfig::default(), cancel.clone());
//! let mut sub = client.subscribe("opportunities", None).await?;
//!
//! while let Some(event) = sub.recv().await {
//!     println!("{:?} {:?}", event.kind, event.key());
//! }
//!
//! client.shutdown();
//! ```

use std::collections::HashMap;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::query::Predicate;

// ── Channel sizing ───────────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;
const COMMAND_CHANNEL_SIZE: usize = 32;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

// ── ChangeEvent ──────────────────────────────────────────────────────

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row change delivered on a topic.
///
/// For inserts and updates `record` holds the new row; for deletes the
/// store only sends the old row, in `old_record`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,

    #[serde(default)]
    pub record: serde_json::Value,

    #[serde(default)]
    pub old_record: serde_json::Value,
}

impl ChangeEvent {
    /// The affected row's key, from whichever side of the event has it.
    pub fn key(&self) -> Option<&str> {
        self.record["id"]
            .as_str()
            .or_else(|| self.old_record["id"].as_str())
    }

    /// Decode the new row into a typed record.
    ///
    /// Returns `None` for rows that don't match the expected shape —
    /// the feed is shared infrastructure and may carry rows from a
    /// newer schema version.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.record.clone()).ok()
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for feed reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── RealtimeClient ───────────────────────────────────────────────────

/// Handle to the shared realtime connection.
///
/// Cheaply cloneable. All subscriptions share one websocket; dropping
/// every clone and cancelling the token tears the connection down.
#[derive(Clone)]
pub struct RealtimeClient {
    cmd_tx: mpsc::Sender<FeedCommand>,
    cancel: CancellationToken,
}

impl RealtimeClient {
    /// Spawn the connection loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously; subscribing
    /// before it completes is fine — joins are queued and sent once the
    /// socket is up.
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            feed_loop(ws_url, cmd_rx, reconnect, task_cancel).await;
        });

        Self { cmd_tx, cancel }
    }

    /// Open a subscription for one resource, optionally narrowed by a
    /// single equality predicate (the only narrowing the feed supports).
    ///
    /// Subscriptions to the same (resource, filter) pair share a topic
    /// and a broadcast channel.
    pub async fn subscribe(
        &self,
        resource: &str,
        filter: Option<Predicate>,
    ) -> Result<FeedSubscription, Error> {
        let topic = subscription_topic(resource, filter.as_ref());
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(FeedCommand::Join {
                topic: topic.clone(),
                resource: resource.to_owned(),
                filter: filter.map(|p| p.to_string()),
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::FeedShutdown)?;

        let rx = reply_rx.await.map_err(|_| Error::FeedShutdown)?;

        Ok(FeedSubscription {
            topic,
            rx,
            cmd_tx: self.cmd_tx.clone(),
            released: false,
        })
    }

    /// Signal the connection loop to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Topic name for a (resource, filter) pair.
fn subscription_topic(resource: &str, filter: Option<&Predicate>) -> String {
    match filter {
        Some(p) => format!("feed:{resource}:{p}"),
        None => format!("feed:{resource}"),
    }
}

// ── FeedSubscription ─────────────────────────────────────────────────

/// An owned, open subscription to one topic.
///
/// Exactly one logical subscription exists per handle; the topic is
/// left when the handle is released, including on drop, so a collection
/// that owns one cannot leak its feed registration on any exit path.
pub struct FeedSubscription {
    topic: String,
    rx: broadcast::Receiver<Arc<ChangeEvent>>,
    cmd_tx: mpsc::Sender<FeedCommand>,
    released: bool,
}

impl FeedSubscription {
    /// Receive the next event on this topic.
    ///
    /// Returns `None` once the client has shut down. A lagged receiver
    /// skips to the oldest retained event — a gap, reported the same way
    /// a reconnect gap would be: not at all. Callers resync if it matters.
    pub async fn recv(&mut self) -> Option<Arc<ChangeEvent>> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(topic = %self.topic, missed, "feed subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Explicitly release the subscription. Equivalent to dropping.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let _ = self.cmd_tx.try_send(FeedCommand::Leave {
                topic: self.topic.clone(),
            });
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

// ── Connection loop ──────────────────────────────────────────────────

enum FeedCommand {
    Join {
        topic: String,
        resource: String,
        filter: Option<String>,
        reply: oneshot::Sender<broadcast::Receiver<Arc<ChangeEvent>>>,
    },
    Leave {
        topic: String,
    },
}

struct TopicState {
    resource: String,
    filter: Option<String>,
    tx: broadcast::Sender<Arc<ChangeEvent>>,
}

enum ConnectionExit {
    Shutdown,
    Reconnect,
}

/// Main loop: connect → serve → on error, backoff → reconnect.
async fn feed_loop(
    url: Url,
    mut cmd_rx: mpsc::Receiver<FeedCommand>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut registry: HashMap<String, TopicState> = HashMap::new();
    let mut attempt: u32 = 0;
    let mut msg_ref: u64 = 0;

    loop {
        let conn = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            conn = tokio_tungstenite::connect_async(url.as_str()) => conn,
        };

        match conn {
            Ok((ws, _response)) => {
                tracing::info!(url = %url, "realtime feed connected");
                attempt = 0;

                match run_connection(ws, &mut registry, &mut cmd_rx, &cancel, &mut msg_ref).await
                {
                    ConnectionExit::Shutdown => break,
                    ConnectionExit::Reconnect => {
                        tracing::info!("realtime feed disconnected, reconnecting");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "realtime connect failed");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(max_retries = max, "realtime reconnection limit reached");
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, &reconnect);
                if serve_during_backoff(delay, &mut registry, &mut cmd_rx, &cancel).await {
                    break;
                }
                attempt += 1;
            }
        }
    }

    tracing::debug!("realtime feed loop exiting");
}

/// Keep answering Join/Leave while waiting out the backoff delay, so a
/// subscriber arriving while the backend is down doesn't block.
/// Returns `true` when the loop should shut down.
async fn serve_during_backoff(
    delay: Duration,
    registry: &mut HashMap<String, TopicState>,
    cmd_rx: &mut mpsc::Receiver<FeedCommand>,
    cancel: &CancellationToken,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return true,
            () = &mut sleep => return false,
            cmd = cmd_rx.recv() => {
                match cmd {
                    None => return true,
                    Some(FeedCommand::Join { topic, resource, filter, reply }) => {
                        let state = register(registry, topic, resource, filter);
                        let _ = reply.send(state.tx.subscribe());
                        // join frame goes out on the next successful connect
                    }
                    Some(FeedCommand::Leave { topic }) => {
                        registry.remove(&topic);
                    }
                }
            }
        }
    }
}

fn register(
    registry: &mut HashMap<String, TopicState>,
    topic: String,
    resource: String,
    filter: Option<String>,
) -> &TopicState {
    registry.entry(topic).or_insert_with(|| {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        TopicState {
            resource,
            filter,
            tx,
        }
    })
}

/// Serve one live connection: re-join registered topics, then multiplex
/// commands, inbound frames, and heartbeats until the socket drops.
async fn run_connection(
    ws: WsStream,
    registry: &mut HashMap<String, TopicState>,
    cmd_rx: &mut mpsc::Receiver<FeedCommand>,
    cancel: &CancellationToken,
    msg_ref: &mut u64,
) -> ConnectionExit {
    let (mut write, mut read) = ws.split();

    // Re-join everything registered before this connection came up
    // (initial joins and survivors of a reconnect alike).
    for (topic, state) in registry.iter() {
        if send_join(&mut write, topic, state, msg_ref).await.is_err() {
            return ConnectionExit::Reconnect;
        }
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return ConnectionExit::Shutdown,
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    // every client handle dropped
                    return ConnectionExit::Shutdown;
                };
                match cmd {
                    FeedCommand::Join { topic, resource, filter, reply } => {
                        let already_joined = registry.contains_key(&topic);
                        let state = register(registry, topic.clone(), resource, filter);
                        let _ = reply.send(state.tx.subscribe());

                        if !already_joined
                            && send_join(&mut write, &topic, state, msg_ref).await.is_err()
                        {
                            return ConnectionExit::Reconnect;
                        }
                    }
                    FeedCommand::Leave { topic } => {
                        if registry.remove(&topic).is_some()
                            && send_leave(&mut write, &topic, msg_ref).await.is_err()
                        {
                            return ConnectionExit::Reconnect;
                        }
                    }
                }
            }
            _ = heartbeat.tick() => {
                if send_heartbeat(&mut write, msg_ref).await.is_err() {
                    return ConnectionExit::Reconnect;
                }
            }
            frame = read.next() => {
                match handle_frame(frame, registry) {
                    Ok(()) => {}
                    Err(exit) => return exit,
                }
            }
        }
    }
}

fn handle_frame(
    frame: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    registry: &HashMap<String, TopicState>,
) -> Result<(), ConnectionExit> {
    match frame {
        Some(Ok(Message::Text(text))) => {
            dispatch_frame(text.as_str(), registry);
            Ok(())
        }
        Some(Ok(Message::Ping(_))) => {
            // tungstenite answers pongs automatically
            Ok(())
        }
        Some(Ok(Message::Close(frame))) => {
            if let Some(ref cf) = frame {
                tracing::info!(code = %cf.code, reason = %cf.reason, "feed close frame");
            } else {
                tracing::info!("feed close frame (no payload)");
            }
            Err(ConnectionExit::Reconnect)
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "feed read error");
            Err(ConnectionExit::Reconnect)
        }
        None => {
            tracing::info!("feed stream ended");
            Err(ConnectionExit::Reconnect)
        }
        _ => Ok(()), // Binary, Pong, Frame — ignore
    }
}

// ── Wire format ──────────────────────────────────────────────────────
//
// Phoenix-style envelopes:
//   out: {"topic", "event": "phx_join" | "phx_leave" | "heartbeat", "payload", "ref"}
//   in:  {"topic", "event": "row_change", "payload": {"data": ChangeEvent}}

#[derive(Serialize)]
struct OutboundFrame<'a> {
    topic: &'a str,
    event: &'a str,
    payload: serde_json::Value,
    #[serde(rename = "ref")]
    msg_ref: String,
}

#[derive(Deserialize)]
struct InboundFrame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

fn next_ref(msg_ref: &mut u64) -> String {
    *msg_ref += 1;
    msg_ref.to_string()
}

fn join_payload(state: &TopicState) -> serde_json::Value {
    serde_json::json!({
        "config": {
            "row_changes": [{
                "event": "*",
                "table": state.resource,
                "filter": state.filter,
            }]
        }
    })
}

async fn send_frame(write: &mut WsSink, frame: &OutboundFrame<'_>) -> Result<(), ()> {
    let text = match serde_json::to_string(frame) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode feed frame");
            return Err(());
        }
    };

    write.send(Message::Text(text.into())).await.map_err(|e| {
        tracing::warn!(error = %e, "feed send failed");
    })
}

async fn send_join(
    write: &mut WsSink,
    topic: &str,
    state: &TopicState,
    msg_ref: &mut u64,
) -> Result<(), ()> {
    tracing::debug!(topic, "joining feed topic");
    send_frame(
        write,
        &OutboundFrame {
            topic,
            event: "phx_join",
            payload: join_payload(state),
            msg_ref: next_ref(msg_ref),
        },
    )
    .await
}

async fn send_leave(write: &mut WsSink, topic: &str, msg_ref: &mut u64) -> Result<(), ()> {
    tracing::debug!(topic, "leaving feed topic");
    send_frame(
        write,
        &OutboundFrame {
            topic,
            event: "phx_leave",
            payload: serde_json::Value::Null,
            msg_ref: next_ref(msg_ref),
        },
    )
    .await
}

async fn send_heartbeat(write: &mut WsSink, msg_ref: &mut u64) -> Result<(), ()> {
    send_frame(
        write,
        &OutboundFrame {
            topic: "phoenix",
            event: "heartbeat",
            payload: serde_json::Value::Null,
            msg_ref: next_ref(msg_ref),
        },
    )
    .await
}

/// Parse an inbound text frame and fan the event out to its topic.
fn dispatch_frame(text: &str, registry: &HashMap<String, TopicState>) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable feed frame");
            return;
        }
    };

    if frame.event != "row_change" {
        // phx_reply, presence, heartbeat acks
        tracing::trace!(event = %frame.event, topic = %frame.topic, "feed control frame");
        return;
    }

    let event: ChangeEvent = match serde_json::from_value(frame.payload["data"].clone()) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, topic = %frame.topic, "malformed change event");
            return;
        }
    };

    if let Some(state) = registry.get(&frame.topic) {
        // Send errors just mean no active subscribers right now
        let _ = state.tx.send(Arc::new(event));
    } else {
        tracing::trace!(topic = %frame.topic, "event for unregistered topic");
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff: `delay = min(initial * 2^attempt, max)`.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exp = attempt.min(16);
    let base = config.initial_delay.saturating_mul(2u32.saturating_pow(exp));
    base.min(config.max_delay)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn topic_state(resource: &str, filter: Option<&str>) -> TopicState {
        let (tx, _) = broadcast::channel(16);
        TopicState {
            resource: resource.to_owned(),
            filter: filter.map(str::to_owned),
            tx,
        }
    }

    #[test]
    fn topic_naming() {
        assert_eq!(subscription_topic("opportunities", None), "feed:opportunities");

        let filter = Predicate::Eq {
            field: "user_id".into(),
            value: "u1".into(),
        };
        assert_eq!(
            subscription_topic("notifications", Some(&filter)),
            "feed:notifications:user_id=eq.u1"
        );
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = ReconnectConfig::default();

        assert_eq!(calculate_backoff(0, &config), Duration::from_secs(1));
        assert_eq!(calculate_backoff(1, &config), Duration::from_secs(2));
        assert_eq!(calculate_backoff(2, &config), Duration::from_secs(4));
        assert_eq!(calculate_backoff(10, &config), Duration::from_secs(30));
        // No overflow at absurd attempt counts
        assert_eq!(calculate_backoff(u32::MAX, &config), Duration::from_secs(30));
    }

    #[test]
    fn join_payload_shape() {
        let state = topic_state("notifications", Some("user_id=eq.u1"));
        let payload = join_payload(&state);

        assert_eq!(payload["config"]["row_changes"][0]["table"], "notifications");
        assert_eq!(payload["config"]["row_changes"][0]["filter"], "user_id=eq.u1");
        assert_eq!(payload["config"]["row_changes"][0]["event"], "*");
    }

    #[test]
    fn dispatch_routes_to_topic() {
        let mut registry = HashMap::new();
        registry.insert("feed:opportunities".to_owned(), topic_state("opportunities", None));
        let mut rx = registry["feed:opportunities"].tx.subscribe();

        let frame = serde_json::json!({
            "topic": "feed:opportunities",
            "event": "row_change",
            "payload": {
                "data": {
                    "type": "INSERT",
                    "record": { "id": "opp-1", "title": "Garden help" }
                }
            }
        });
        dispatch_frame(&frame.to_string(), &registry);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.key(), Some("opp-1"));
    }

    #[test]
    fn dispatch_ignores_control_frames() {
        let mut registry = HashMap::new();
        registry.insert("feed:opportunities".to_owned(), topic_state("opportunities", None));
        let mut rx = registry["feed:opportunities"].tx.subscribe();

        let frame = serde_json::json!({
            "topic": "feed:opportunities",
            "event": "phx_reply",
            "payload": { "status": "ok" }
        });
        dispatch_frame(&frame.to_string(), &registry);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dispatch_survives_malformed_input() {
        let registry = HashMap::new();
        dispatch_frame("not json at all", &registry);
        dispatch_frame(r#"{"topic":"t","event":"row_change","payload":{}}"#, &registry);
    }

    #[test]
    fn delete_event_key_comes_from_old_record() {
        let event: ChangeEvent = serde_json::from_value(serde_json::json!({
            "type": "DELETE",
            "old_record": { "id": "opp-9" }
        }))
        .unwrap();

        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.key(), Some("opp-9"));
    }

    #[test]
    fn decode_tolerates_schema_drift() {
        #[derive(Deserialize)]
        struct Row {
            id: String,
        }

        let event: ChangeEvent = serde_json::from_value(serde_json::json!({
            "type": "INSERT",
            "record": { "id": "n-1", "message": "hi", "brand_new_column": 42 }
        }))
        .unwrap();

        let row: Row = event.decode().unwrap();
        assert_eq!(row.id, "n-1");

        let bad: Option<Row> = ChangeEvent {
            kind: ChangeKind::Insert,
            record: serde_json::json!({ "no_id": true }),
            old_record: serde_json::Value::Null,
        }
        .decode();
        assert!(bad.is_none());
    }
}
