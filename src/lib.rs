//! EdgePulse - real-time synchronization layer for edge-compute fleet monitoring
//!
//! This library keeps a client's view of a monitored edge fleet current: a
//! self-healing WebSocket event stream routed into a bounded alert store, and
//! deduplicated, TTL-cached polling of REST resources.
//!
//! - [`stream`]: connection lifecycle, heartbeat and bounded exponential reconnect
//! - [`router`]: typed classification of inbound frames
//! - [`alerts`]: newest-first alert store and live metrics snapshot
//! - [`fetch`]: cache, in-flight deduplication and interval polling
//! - [`notify`]: user-facing notification channel

pub mod alerts;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod router;
pub mod stream;
