//! Alert record types shared by the router and the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to an alert by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an alert as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Active,
    Acknowledged,
    Resolved,
}

/// A monitored edge location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfPresence {
    /// Short location code (e.g. "lax1")
    pub code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    /// Capacity tier ("tier1", "tier2"), when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl PointOfPresence {
    /// Human-readable label, preferring the city name over the code.
    pub fn label(&self) -> &str {
        if self.city.trim().is_empty() {
            &self.code
        } else {
            &self.city
        }
    }
}

/// One alert held in the bounded store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Backend-assigned identifier, absent for synthesized records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub severity: Severity,
    pub pop: PointOfPresence,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub status: AlertStatus,
}

impl AlertRecord {
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Derived counts over the store contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub total: usize,
    pub active: usize,
    pub critical: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_serde_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn test_severity_rejects_unknown() {
        assert!(serde_json::from_str::<Severity>("\"catastrophic\"").is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_status_default_is_active() {
        assert_eq!(AlertStatus::default(), AlertStatus::Active);
    }

    #[test]
    fn test_pop_label_falls_back_to_code() {
        let pop = PointOfPresence {
            code: "fra1".to_string(),
            city: String::new(),
            country: "Germany".to_string(),
            tier: None,
            latitude: None,
            longitude: None,
        };
        assert_eq!(pop.label(), "fra1");
    }

    #[test]
    fn test_pop_parses_minimal_payload() {
        let pop: PointOfPresence = serde_json::from_str(r#"{"code":"nrt1"}"#).unwrap();
        assert_eq!(pop.code, "nrt1");
        assert!(pop.city.is_empty());
        assert!(pop.tier.is_none());
    }
}
