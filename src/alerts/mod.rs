//! Alert state held in memory
//!
//! - [`AlertStore`]: the bounded, newest-first event store
//! - [`LiveMetrics`]: the shallow-merged live metrics snapshot
//!
//! Both are written only by the message router; everything else reads snapshots.

pub mod live;
pub mod store;
pub mod types;

pub use live::{LiveMetrics, MetricsSnapshot};
pub use store::{AlertStore, DEFAULT_ALERT_CAPACITY};
pub use types::{AlertCounts, AlertRecord, AlertStatus, PointOfPresence, Severity};
