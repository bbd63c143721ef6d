//! Live metrics snapshot fed by `metrics_update` frames.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::RwLock;

/// Point-in-time copy of the live metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub values: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Shallow-merged key/value view of the most recent metrics pushes.
#[derive(Default)]
pub struct LiveMetrics {
    inner: RwLock<MetricsSnapshot>,
}

impl LiveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `update` into the snapshot; same-named keys are overwritten.
    pub fn merge(&self, update: Map<String, Value>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        for (key, value) in update {
            inner.values.insert(key, value);
        }
        inner.updated_at = Some(Utc::now());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values
            .get(key)
            .cloned()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
