//! Printer Device Model

use serde::{Deserialize, Serialize};

/// Default raw-print TCP port used by thermal printers
pub const DEFAULT_NETWORK_PORT: u16 = 9100;

/// Default paper width in characters (80mm paper)
pub const DEFAULT_PAPER_WIDTH: usize = 48;

/// Physical connection to a printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrinterTransport {
    /// USB-serial adapter (e.g. `/dev/ttyUSB0`, `COM3`)
    Serial { port: String, baud_rate: u32 },
    /// Raw TCP socket
    Network {
        host: String,
        #[serde(default = "default_network_port")]
        port: u16,
    },
}

fn default_network_port() -> u16 {
    DEFAULT_NETWORK_PORT
}

impl PrinterTransport {
    /// Short human-readable endpoint, used in logs and error messages
    pub fn endpoint(&self) -> String {
        match self {
            Self::Serial { port, baud_rate } => format!("{}@{}", port, baud_rate),
            Self::Network { host, port } => format!("{}:{}", host, port),
        }
    }
}

/// Printer device entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterDevice {
    pub id: i64,
    pub name: String,
    pub transport: PrinterTransport,
    /// Characters per line at normal font size (32 for 58mm, 48 for 80mm)
    pub paper_width: usize,
    pub active: bool,
    pub last_used_at: Option<i64>,
    pub created_at: i64,
}

/// Create printer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterDeviceCreate {
    pub name: String,
    pub transport: PrinterTransport,
    #[serde(default = "default_paper_width")]
    pub paper_width: usize,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Update printer payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterDeviceUpdate {
    pub name: Option<String>,
    pub transport: Option<PrinterTransport>,
    pub paper_width: Option<usize>,
}

/// Result of a connectivity test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

fn default_paper_width() -> usize {
    DEFAULT_PAPER_WIDTH
}

fn default_true() -> bool {
    true
}
