// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push connection lifecycle.
//!
//! The manager owns at most one live socket. Connecting closes any prior
//! socket first; a drop or read error schedules a single reconnect attempt
//! after a backoff delay, as long as a token is still set. `disconnect`
//! clears the token, which turns any pending reconnect timer into a no-op.
//!
//! Connection trouble is never surfaced to callers as an error: reconnection
//! is the sole recovery mechanism, observable through [`PushManager::state`].

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use palaver_core::PushEvent;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    ReconnectPending,
}

/// Push connection configuration.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Event stream endpoint (`ws://` or `wss://`). The access token is
    /// appended as a `token` query parameter at connect time.
    pub url: String,
    pub connect_timeout: Duration,
    /// Delay before the first reconnect attempt; doubles per consecutive
    /// failure up to `reconnect_max`.
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    /// Cap on consecutive reconnect attempts. `None` retries for as long as a
    /// token is set.
    pub max_attempts: Option<u32>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout: Duration::from_secs(10),
            reconnect_initial: Duration::from_secs(3),
            reconnect_max: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<PushEvent>,
}

type SubscriberRegistry = Arc<StdMutex<Vec<Subscriber>>>;

/// A live subscription to decoded push events.
///
/// Dropping the subscription unregisters it; doing so from within a consumer
/// task at any time is safe.
pub struct EventSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<PushEvent>,
    registry: Weak<StdMutex<Vec<Subscriber>>>,
}

impl EventSubscription {
    /// Receive the next event. `None` once the manager is gone.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for draining in tests and polls.
    pub fn try_recv(&mut self) -> Option<PushEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut subs = registry.lock().unwrap_or_else(|e| e.into_inner());
            subs.retain(|s| s.id != self.id);
        }
    }
}

struct Inner {
    config: PushConfig,
    state: RwLock<ConnectionState>,
    /// Set by `connect`, cleared by `disconnect`. A pending reconnect checks
    /// this before dialing; clearing it defuses the timer.
    token: Mutex<Option<String>>,
    writer: Mutex<Option<WsWriter>>,
    read_task: Mutex<Option<JoinHandle<()>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    consecutive_failures: AtomicU32,
    subscribers: SubscriberRegistry,
    next_subscriber_id: AtomicU64,
}

/// Owner of the single push socket and its reconnect policy.
#[derive(Clone)]
pub struct PushManager {
    inner: Arc<Inner>,
}

impl PushManager {
    pub fn new(config: PushConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: RwLock::new(ConnectionState::Disconnected),
                token: Mutex::new(None),
                writer: Mutex::new(None),
                read_task: Mutex::new(None),
                reconnect_task: Mutex::new(None),
                consecutive_failures: AtomicU32::new(0),
                subscribers: Arc::new(StdMutex::new(Vec::new())),
                next_subscriber_id: AtomicU64::new(0),
            }),
        }
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.inner.state.read().await
    }

    /// Open the event stream with the given access token.
    ///
    /// Any existing socket is closed first, so at most one socket is ever
    /// live. The token is kept for reconnects until `disconnect`. Connection
    /// failures are not returned; they feed the reconnect policy.
    pub async fn connect(&self, token: &str) {
        *self.inner.token.lock().await = Some(token.to_string());
        self.inner.consecutive_failures.store(0, Ordering::Relaxed);
        if let Some(timer) = self.inner.reconnect_task.lock().await.take() {
            timer.abort();
        }
        Inner::connect_once(Arc::clone(&self.inner)).await;
    }

    /// Close the socket, cancel any pending reconnect, and forget the token.
    pub async fn disconnect(&self) {
        *self.inner.token.lock().await = None;
        if let Some(timer) = self.inner.reconnect_task.lock().await.take() {
            timer.abort();
        }
        self.inner.teardown_socket().await;
        *self.inner.state.write().await = ConnectionState::Disconnected;
        debug!("push connection closed by caller");
    }

    /// Register a listener. Every successfully decoded event is delivered to
    /// every live subscription.
    pub fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Subscriber { id, tx });
        EventSubscription {
            id,
            rx,
            registry: Arc::downgrade(&self.inner.subscribers),
        }
    }
}

impl Inner {
    fn connect_once(
        inner: Arc<Inner>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
        let Some(token) = inner.token.lock().await.clone() else {
            return;
        };

        inner.teardown_socket().await;
        *inner.state.write().await = ConnectionState::Connecting;

        let url = match endpoint_url(&inner.config.url, &token) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "invalid push endpoint");
                Inner::schedule_reconnect(inner).await;
                return;
            }
        };

        let connected = timeout(inner.config.connect_timeout, connect_async(url.as_str())).await;
        match connected {
            Ok(Ok((stream, _response))) => {
                let (writer, reader) = stream.split();
                *inner.writer.lock().await = Some(writer);
                *inner.state.write().await = ConnectionState::Open;
                inner.consecutive_failures.store(0, Ordering::Relaxed);
                let handle = tokio::spawn(Inner::read_loop(Arc::clone(&inner), reader));
                *inner.read_task.lock().await = Some(handle);
                info!("push connection open");
            }
            Ok(Err(err)) => {
                warn!(error = %err, "push connect failed");
                Inner::schedule_reconnect(inner).await;
            }
            Err(_) => {
                warn!(timeout = ?inner.config.connect_timeout, "push connect timed out");
                Inner::schedule_reconnect(inner).await;
            }
        }
        })
    }

    async fn read_loop(inner: Arc<Inner>, mut reader: WsReader) {
        while let Some(frame) = reader.next().await {
            match frame {
                Ok(Message::Text(text)) => match PushEvent::from_frame(text.as_str()) {
                    Ok(event) => inner.fan_out(event),
                    // Malformed frames are dropped; the connection stays open.
                    Err(err) => warn!(error = %err, "malformed push frame dropped"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {} // binary/ping/pong handled by the protocol layer
                Err(err) => {
                    // Read errors get the same treatment as a close.
                    warn!(error = %err, "push socket error");
                    break;
                }
            }
        }

        *inner.writer.lock().await = None;
        Inner::schedule_reconnect(inner).await;
    }

    /// Schedule exactly one reconnect attempt, replacing any pending timer.
    async fn schedule_reconnect(inner: Arc<Inner>) {
        if inner.token.lock().await.is_none() {
            *inner.state.write().await = ConnectionState::Disconnected;
            return;
        }

        let failures = inner.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        if let Some(max) = inner.config.max_attempts
            && failures >= max
        {
            warn!(attempts = failures, "reconnect attempts exhausted, giving up");
            *inner.token.lock().await = None;
            *inner.state.write().await = ConnectionState::Disconnected;
            return;
        }

        let delay = backoff_delay(
            inner.config.reconnect_initial,
            inner.config.reconnect_max,
            failures,
        );
        *inner.state.write().await = ConnectionState::ReconnectPending;
        debug!(?delay, attempt = failures + 1, "push reconnect scheduled");

        let mut timer = inner.reconnect_task.lock().await;
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        let for_timer = Arc::clone(&inner);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if for_timer.token.lock().await.is_some() {
                Inner::connect_once(Arc::clone(&for_timer)).await;
            }
        }));
    }

    async fn teardown_socket(&self) {
        if let Some(task) = self.read_task.lock().await.take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.send(Message::Close(None)).await;
        }
    }

    fn fan_out(&self, event: PushEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|s| s.tx.send(event.clone()).is_ok());
    }
}

/// Build the connect URL with the access token as a query credential.
fn endpoint_url(base: &str, token: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Exponential backoff: `initial * 2^failures`, clamped to `max`.
fn backoff_delay(initial: Duration, max: Duration, failures: u32) -> Duration {
    let shift = failures.min(16);
    initial.saturating_mul(1u32 << shift).min(max)
}
