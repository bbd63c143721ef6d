//! Live event stream connection management
//!
//! [`ConnectionManager`] owns one logical WebSocket connection to the event source:
//!
//! - `disconnected → connecting` on [`ConnectionManager::connect`] or a scheduled retry
//! - `connecting → connected` on open: backoff reset, subscribe frame sent, heartbeat started
//! - `connected → disconnected` on close: heartbeat stopped, retry scheduled with
//!   bounded exponential backoff until the attempt budget runs out
//! - `any → error` on a transport error; the following close still drives retries
//!
//! Every inbound text frame is handed, in receipt order, to a [`FrameHandler`].
//! All timers and the socket live inside one background task whose liveness is a
//! [`CancellationToken`]; [`ConnectionManager::close`] (or dropping the manager)
//! releases them.

mod config;
mod error;
mod state;

pub use config::{StreamConfig, DEFAULT_TOPICS};
pub use error::StreamError;
pub use state::{Backoff, ConnectionState};

use std::sync::{Arc, Mutex, MutexGuard};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::notify::{Notification, Notifier};
use crate::router::OutboundMessage;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receives every inbound text frame, synchronously and in arrival order.
pub trait FrameHandler: Send + Sync + 'static {
    fn handle_frame(&self, raw: &str);
}

/// State shared between the public handle and the lifecycle task.
struct Shared {
    config: StreamConfig,
    handler: Arc<dyn FrameHandler>,
    notifier: Notifier,
    state_tx: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<OutboundMessage>>>,
    backoff: Mutex<Backoff>,
}

impl Shared {
    fn backoff(&self) -> MutexGuard<'_, Backoff> {
        self.backoff.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<OutboundMessage>>> {
        self.outbound.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publishes a state change unless the session has been torn down.
    ///
    /// The check runs under the watch channel's lock, so a transition racing
    /// with `close()` can never overwrite the final `disconnected`.
    fn transition(&self, next: ConnectionState, cancel: &CancellationToken) {
        let changed = self.state_tx.send_if_modified(|state| {
            if cancel.is_cancelled() || *state == next {
                return false;
            }
            *state = next;
            true
        });

        if changed {
            tracing::debug!(state = %next, "Connection state changed");
            metrics::gauge!(crate::metrics::CONNECTION_STATE).set(next.as_gauge());
            self.notifier
                .publish(Notification::StateChanged { state: next });
        }
    }

    /// Unconditional transition used by teardown.
    fn force_state(&self, next: ConnectionState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            metrics::gauge!(crate::metrics::CONNECTION_STATE).set(next.as_gauge());
            self.notifier
                .publish(Notification::StateChanged { state: next });
        }
    }

    async fn open(&self) -> Result<Socket, StreamError> {
        let timeout = self.config.connect_timeout();
        match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(self.config.url.as_str()))
            .await
        {
            Ok(Ok((socket, response))) => {
                tracing::info!(
                    url = %self.config.url,
                    status = %response.status(),
                    "Connected to event source"
                );
                Ok(socket)
            }
            Ok(Err(e)) => Err(StreamError::ConnectFailed(e.to_string())),
            Err(_) => Err(StreamError::ConnectTimeout(self.config.connect_timeout_ms)),
        }
    }
}

/// A running lifecycle task and its liveness flag.
struct Session {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of the single persistent event-stream connection.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl ConnectionManager {
    /// Create a manager. Nothing is opened until [`connect`](Self::connect).
    pub fn new(config: StreamConfig, handler: Arc<dyn FrameHandler>, notifier: Notifier) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let backoff = Backoff::from_config(&config);

        Self {
            shared: Arc::new(Shared {
                config,
                handler,
                notifier,
                state_tx,
                outbound: Mutex::new(None),
                backoff: Mutex::new(backoff),
            }),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.shared.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Receiver that observes every published state.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Reconnect attempts scheduled since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.shared.backoff().attempt()
    }

    /// Whether a lifecycle task is currently running.
    pub fn is_running(&self) -> bool {
        self.session()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Start the connection lifecycle.
    ///
    /// No-op while a previous lifecycle task is still running, so two attempts
    /// are never in flight at once. Must be called inside a tokio runtime.
    pub fn connect(&self) {
        let mut session = self.session();
        if let Some(existing) = session.as_ref() {
            if !existing.handle.is_finished() {
                tracing::debug!("Connection lifecycle already running");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_lifecycle(Arc::clone(&self.shared), cancel.clone()));
        *session = Some(Session { cancel, handle });
    }

    /// Manually restart after retries were exhausted.
    ///
    /// Resets the backoff budget. Returns `false` (and does nothing) while a
    /// lifecycle task is still running.
    pub fn reconnect(&self) -> bool {
        if self.is_running() {
            tracing::debug!("Reconnect requested while lifecycle is running, ignoring");
            return false;
        }
        self.shared.backoff().reset();
        self.connect();
        true
    }

    /// Send a frame to the event source.
    ///
    /// Returns `false` with a logged warning when not connected; frames are
    /// never buffered for a later connection.
    pub fn send(&self, message: OutboundMessage) -> bool {
        let state = self.state();
        if state != ConnectionState::Connected {
            tracing::warn!(state = %state, message = ?message, "Cannot send, not connected");
            return false;
        }

        match self.shared.outbound().as_ref() {
            Some(tx) => tx.send(message).is_ok(),
            None => {
                tracing::warn!(message = ?message, "Cannot send, connection is closing");
                false
            }
        }
    }

    /// Tear down: stops the heartbeat, any pending reconnect and the socket.
    ///
    /// Idempotent. Frames or results arriving afterwards are discarded.
    pub fn close(&self) {
        if let Some(session) = self.session().take() {
            session.cancel.cancel();
            tracing::info!("Event stream connection closed");
        }
        self.shared.outbound().take();
        self.shared.force_state(ConnectionState::Disconnected);
    }

    /// Close and wait for the lifecycle task to finish.
    pub async fn shutdown(&self) {
        let session = self.session().take();
        if let Some(session) = session {
            session.cancel.cancel();
            if let Err(e) = session.handle.await {
                tracing::warn!(error = %e, "Connection lifecycle task ended abnormally");
            }
        }
        self.shared.outbound().take();
        self.shared.force_state(ConnectionState::Disconnected);
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(session) = self.session().take() {
            session.cancel.cancel();
        }
    }
}

/// Connect, run, and reconnect until cancelled or out of attempts.
async fn run_lifecycle(shared: Arc<Shared>, cancel: CancellationToken) {
    loop {
        shared.transition(ConnectionState::Connecting, &cancel);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = shared.open() => result,
        };

        match opened {
            Ok(socket) => {
                shared.backoff().reset();
                if let Err(e) = run_session(&shared, socket, &cancel).await {
                    tracing::warn!(error = %e, "Event stream transport error");
                    shared.transition(ConnectionState::Error, &cancel);
                }
            }
            Err(e) => {
                tracing::warn!(url = %shared.config.url, error = %e, "Failed to connect to event source");
                shared.transition(ConnectionState::Error, &cancel);
            }
        }

        if cancel.is_cancelled() {
            break;
        }
        shared.transition(ConnectionState::Disconnected, &cancel);

        let (next, attempt) = {
            let mut backoff = shared.backoff();
            let next = backoff.next_delay();
            (next, backoff.attempt())
        };

        let Some(delay) = next else {
            tracing::warn!(
                attempts = attempt,
                "Reconnection attempts exhausted, giving up on event source"
            );
            shared
                .notifier
                .publish(Notification::ConnectionLost { attempts: attempt });
            break;
        };

        metrics::counter!(crate::metrics::RECONNECTS_TOTAL).increment(1);
        tracing::info!(
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnect scheduled"
        );
        shared.transition(ConnectionState::Connecting, &cancel);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    shared.outbound().take();
    tracing::debug!("Connection lifecycle stopped");
}

/// Drive one open socket until it closes, fails, or the session is cancelled.
async fn run_session(
    shared: &Shared,
    socket: Socket,
    cancel: &CancellationToken,
) -> Result<(), StreamError> {
    let (tx, rx) = mpsc::unbounded_channel::<OutboundMessage>();
    *shared.outbound() = Some(tx);

    shared.transition(ConnectionState::Connected, cancel);
    let result = pump(shared, socket, rx, cancel).await;

    shared.outbound().take();

    match result {
        Err(StreamError::Closed) => Ok(()),
        other => other,
    }
}

/// Subscribe, then multiplex inbound frames, heartbeats and outbound sends.
async fn pump(
    shared: &Shared,
    socket: Socket,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    cancel: &CancellationToken,
) -> Result<(), StreamError> {
    let (mut write, mut read) = socket.split();

    let subscribe = OutboundMessage::Subscribe {
        topics: shared.config.topics.clone(),
    };
    write.send(Message::Text(subscribe.to_json())).await?;
    tracing::debug!(topics = ?shared.config.topics, "Subscribe frame sent");

    let period = shared.config.heartbeat_interval();
    let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Best effort; the peer may already be gone
                let _ = write.send(Message::Close(None)).await;
                return Ok(());
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => shared.handler.handle_frame(&text),
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Event source closed the connection");
                    return Ok(());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!(len = data.len(), "Ignoring binary frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(StreamError::from(e)),
                None => return Ok(()),
            },
            _ = heartbeat.tick() => {
                write.send(Message::Text(OutboundMessage::Ping.to_json())).await?;
                tracing::trace!("Heartbeat ping sent");
            }
            Some(message) = outbound.recv() => {
                write.send(Message::Text(message.to_json())).await?;
            }
        }
    }
}
