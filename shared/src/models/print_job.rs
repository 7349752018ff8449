//! Print Job Model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Print job lifecycle status
///
/// ```text
/// PENDING --claim--> IN_PROGRESS --success--> PRINTED
/// IN_PROGRESS --failure--> FAILED --retry--> PENDING
/// {PENDING, FAILED} --cancel--> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintJobStatus {
    Pending,
    InProgress,
    Printed,
    Failed,
    Cancelled,
}

impl PrintJobStatus {
    /// PRINTED and CANCELLED admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Printed | Self::Cancelled)
    }

    /// Only jobs that have not reached the device may be cancelled
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Printed => "PRINTED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for PrintJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "PRINTED" => Ok(Self::Printed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown print job status: {}", other)),
        }
    }
}

impl fmt::Display for PrintJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Print job entity: one attempt-tracked ticket for one order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: i64,
    /// Order line this ticket belongs to (reference only)
    pub order_item_id: i64,
    /// Device requested at enqueue time; unpinned jobs follow default/fallback selection
    #[serde(default)]
    pub pinned_printer_id: Option<i64>,
    /// Device of the most recent claim (the pinned device until then)
    pub printer_id: Option<i64>,
    pub status: PrintJobStatus,
    /// Dispatch attempts consumed so far
    pub attempts: u32,
    pub max_attempts: u32,
    pub error_message: Option<String>,
    /// Higher runs first
    pub priority: i32,
    pub created_at: i64,
    pub updated_at: i64,
    pub printed_at: Option<i64>,
}

impl PrintJob {
    /// Whether a retry would be accepted
    pub fn has_retry_budget(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Whether this job still holds `printer_id` for dispatch
    ///
    /// PENDING jobs hold only their pinned device; the device of an earlier
    /// failed attempt is history. IN_PROGRESS jobs hold the claimed device.
    pub fn holds_printer(&self, printer_id: i64) -> bool {
        match self.status {
            PrintJobStatus::Pending => self.pinned_printer_id == Some(printer_id),
            PrintJobStatus::InProgress => self.printer_id == Some(printer_id),
            _ => false,
        }
    }
}

/// Enqueue payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJobCreate {
    pub order_item_id: i64,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub printer_id: Option<i64>,
}

/// List filter
///
/// Empty query values (`?status=`) mean "no filter".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrintJobQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<PrintJobStatus>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub order_item_id: Option<i64>,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl PrintJobQuery {
    pub fn matches(&self, job: &PrintJob) -> bool {
        self.status.is_none_or(|s| s == job.status)
            && self.order_item_id.is_none_or(|id| id == job.order_item_id)
    }
}

/// Counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJobSummary {
    pub pending: u64,
    pub in_progress: u64,
    pub printed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl PrintJobSummary {
    pub fn record(&mut self, status: PrintJobStatus) {
        match status {
            PrintJobStatus::Pending => self.pending += 1,
            PrintJobStatus::InProgress => self.in_progress += 1,
            PrintJobStatus::Printed => self.printed += 1,
            PrintJobStatus::Failed => self.failed += 1,
            PrintJobStatus::Cancelled => self.cancelled += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&PrintJobStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let status: PrintJobStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(status, PrintJobStatus::Cancelled);
    }

    #[test]
    fn test_status_predicates() {
        assert!(PrintJobStatus::Printed.is_terminal());
        assert!(PrintJobStatus::Cancelled.is_terminal());
        assert!(!PrintJobStatus::Failed.is_terminal());

        assert!(PrintJobStatus::Pending.is_cancellable());
        assert!(PrintJobStatus::Failed.is_cancellable());
        assert!(!PrintJobStatus::InProgress.is_cancellable());
        assert!(!PrintJobStatus::Printed.is_cancellable());
    }

    #[test]
    fn test_query_treats_empty_values_as_absent() {
        let query: PrintJobQuery =
            serde_json::from_value(serde_json::json!({"status": "", "order_item_id": ""}))
                .unwrap();
        assert!(query.status.is_none());
        assert!(query.order_item_id.is_none());

        let query: PrintJobQuery =
            serde_json::from_value(serde_json::json!({"status": "FAILED", "order_item_id": "42"}))
                .unwrap();
        assert_eq!(query.status, Some(PrintJobStatus::Failed));
        assert_eq!(query.order_item_id, Some(42));

        assert!(
            serde_json::from_value::<PrintJobQuery>(serde_json::json!({"status": "LOST"}))
                .is_err()
        );
    }

    #[test]
    fn test_summary_serializes_snake_case() {
        let mut summary = PrintJobSummary::default();
        summary.record(PrintJobStatus::Failed);
        summary.record(PrintJobStatus::InProgress);
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["in_progress"], 1);
        assert_eq!(json["pending"], 0);
    }
}
