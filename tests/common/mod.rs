//! Shared test utilities for EdgePulse integration tests.
//!
//! Provides an in-process WebSocket event source, frame builders and
//! polling helpers.

#![allow(dead_code)]

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use edgepulse::stream::StreamConfig;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// =============================================================================
// Mock Event Source
// =============================================================================

/// Commands pushed to every open connection.
#[derive(Debug, Clone)]
pub enum ServerCommand {
    Text(String),
    Close,
}

#[derive(Clone)]
struct SourceState {
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    open: Arc<AtomicUsize>,
    commands: broadcast::Sender<ServerCommand>,
}

/// WebSocket server standing in for the backend event source.
///
/// Greets every connection with a `welcome` frame, records every text frame it
/// receives, and answers `{"type":"ping"}` with `{"type":"pong"}`.
pub struct MockEventSource {
    addr: SocketAddr,
    state: SourceState,
}

impl MockEventSource {
    pub async fn start() -> Self {
        let (commands, _) = broadcast::channel(64);
        let state = SourceState {
            received: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(AtomicUsize::new(0)),
            open: Arc::new(AtomicUsize::new(0)),
            commands,
        };

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Total connections accepted so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Connections currently open.
    pub fn open_connections(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }

    /// Every text frame received, in order, across all connections.
    pub fn received(&self) -> Vec<Value> {
        self.state
            .received
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap_or(Value::String(raw.clone())))
            .collect()
    }

    /// Received frames whose `type` is `kind`.
    pub fn received_of_type(&self, kind: &str) -> Vec<Value> {
        self.received()
            .into_iter()
            .filter(|frame| frame["type"] == kind)
            .collect()
    }

    /// Push a raw text frame to every open connection.
    pub fn push_raw(&self, raw: impl Into<String>) {
        let _ = self.state.commands.send(ServerCommand::Text(raw.into()));
    }

    /// Push a JSON frame to every open connection.
    pub fn push(&self, frame: Value) {
        self.push_raw(frame.to_string());
    }

    /// Close every open connection from the server side.
    pub fn close_all(&self) {
        let _ = self.state.commands.send(ServerCommand::Close);
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SourceState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: SourceState) {
    let mut commands = state.commands.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);
    state.open.fetch_add(1, Ordering::SeqCst);

    let welcome = json!({"type": "welcome", "message": "connected to mock source"});
    if socket
        .send(Message::Text(welcome.to_string()))
        .await
        .is_ok()
    {
        loop {
            tokio::select! {
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let is_ping = serde_json::from_str::<Value>(&text)
                            .map(|v| v["type"] == "ping")
                            .unwrap_or(false);
                        state.received.lock().unwrap().push(text);
                        if is_ping {
                            let pong = json!({"type": "pong"}).to_string();
                            if socket.send(Message::Text(pong)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                },
                command = commands.recv() => match command {
                    Ok(ServerCommand::Text(text)) => {
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(ServerCommand::Close) => {
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                    Err(_) => break,
                },
            }
        }
    }

    state.open.fetch_sub(1, Ordering::SeqCst);
}

// =============================================================================
// Config and Frame Builders
// =============================================================================

/// Stream config with test-sized timers.
pub fn fast_stream_config(url: String) -> StreamConfig {
    StreamConfig {
        url,
        heartbeat_interval_ms: 10_000,
        reconnect_base_delay_ms: 20,
        reconnect_max_delay_ms: 80,
        max_reconnect_attempts: 3,
        connect_timeout_ms: 1_000,
        ..StreamConfig::default()
    }
}

/// A URL on which nothing is listening.
pub async fn unused_ws_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/ws", addr)
}

pub fn alert_frame(id: &str, severity: &str, pop_code: &str, city: &str) -> Value {
    json!({
        "type": "alert",
        "data": {
            "id": id,
            "severity": severity,
            "pop": {"code": pop_code, "city": city, "country": "US"},
            "message": format!("{} alert at {}", severity, city),
            "created_at": "2026-10-16T12:00:00Z"
        }
    })
}

// =============================================================================
// Waiting
// =============================================================================

/// Poll `condition` every 10ms until it holds; panics after `timeout`.
pub async fn wait_until<F>(timeout: Duration, description: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {}", description);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
