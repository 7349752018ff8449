//! Order Model
//!
//! Orders and their lines are owned by the order service; the print engine
//! only reads them and requests status transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order line status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderLineStatus {
    Created,
    Preparing,
    Served,
    Canceled,
}

impl fmt::Display for OrderLineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Preparing => "PREPARING",
            Self::Served => "SERVED",
            Self::Canceled => "CANCELED",
        };
        f.write_str(s)
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Preparing,
    Served,
    Paid,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Preparing => "PREPARING",
            Self::Served => "SERVED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Order line (one dish or drink)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub name: String,
    pub quantity: i32,
    #[serde(default)]
    pub notes: Option<String>,
    /// Packed to go
    #[serde(default)]
    pub takeaway: bool,
    pub status: OrderLineStatus,
    pub created_at: i64,
    #[serde(default)]
    pub preparing_at: Option<i64>,
    #[serde(default)]
    pub served_at: Option<i64>,
    #[serde(default)]
    pub canceled_at: Option<i64>,
}

impl OrderLine {
    pub fn is_canceled(&self) -> bool {
        self.status == OrderLineStatus::Canceled
    }

    /// Set status and stamp the matching transition timestamp
    pub fn set_status(&mut self, status: OrderLineStatus, now: i64) {
        self.status = status;
        match status {
            OrderLineStatus::Created => {}
            OrderLineStatus::Preparing => self.preparing_at = Some(now),
            OrderLineStatus::Served => self.served_at = Some(now),
            OrderLineStatus::Canceled => self.canceled_at = Some(now),
        }
    }
}

/// Order entity with its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    /// Assigned waiter
    #[serde(default)]
    pub staff: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Lines that still count towards the order aggregate
    pub fn active_lines(&self) -> impl Iterator<Item = &OrderLine> {
        self.lines.iter().filter(|l| !l.is_canceled())
    }

    /// Whether any line is packed to go
    pub fn has_takeaway(&self) -> bool {
        self.lines.iter().any(|l| l.takeaway)
    }

    /// True when there is at least one non-cancelled line and all of them are PREPARING
    pub fn all_lines_preparing(&self) -> bool {
        let mut any = false;
        for line in self.active_lines() {
            if line.status != OrderLineStatus::Preparing {
                return false;
            }
            any = true;
        }
        any
    }
}
