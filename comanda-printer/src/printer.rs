//! Printer adapters for sending ESC/POS data
//!
//! Supports:
//! - Network printers (raw TCP, port 9100)
//! - USB-serial printers (`/dev/ttyUSB0`, `COM3`, ...)
//!
//! There is no application-level acknowledgment: a print succeeds once the
//! transport accepted every byte.

use crate::error::{PrintError, PrintResult};
use serial2_tokio::SerialPort;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer is online/reachable
    async fn is_online(&self) -> bool;
}

/// Network printer (TCP port 9100)
///
/// Most thermal printers support raw TCP printing on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer
    ///
    /// `host` may be an IP address or a resolvable hostname.
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(PrintError::InvalidConfig("Printer host is empty".into()));
        }
        if port == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid port 0 for host {}",
                host
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set connect/write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the printer address as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self, timeout: Duration) -> PrintResult<TcpStream> {
        tokio::time::timeout(timeout, TcpStream::connect((self.host.as_str(), self.port)))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr())))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr(), e)))
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(addr = %self.addr(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        debug!("Connecting to printer");
        let mut stream = self.connect(self.timeout).await?;

        debug!("Connected, sending {} bytes", data.len());
        let write = async {
            stream.write_all(data).await?;
            stream.flush().await?;
            stream.shutdown().await
        };

        match tokio::time::timeout(self.timeout, write).await {
            Err(_) => Err(PrintError::Timeout(format!("Write timeout: {}", self.addr()))),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::WriteZero => {
                Err(PrintError::Rejected(format!("{}: {}", self.addr(), e)))
            }
            Ok(Err(e)) => Err(PrintError::Io(e)),
            Ok(Ok(())) => {
                info!("Print data sent");
                Ok(())
            }
        }
    }

    #[instrument(skip(self), fields(addr = %self.addr()))]
    async fn is_online(&self) -> bool {
        match self.connect(self.timeout.min(Duration::from_millis(500))).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Printer offline");
                false
            }
        }
    }
}

/// USB-serial printer
#[derive(Debug, Clone)]
pub struct SerialPrinter {
    path: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialPrinter {
    /// Create a new serial printer for a device path and baud rate
    pub fn new(path: &str, baud_rate: u32) -> PrintResult<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PrintError::InvalidConfig("Serial port path is empty".into()));
        }
        if baud_rate == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid baud rate 0 for {}",
                path
            )));
        }

        Ok(Self {
            path: path.to_string(),
            baud_rate,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serial device path
    pub fn path(&self) -> &str {
        &self.path
    }

    fn open(&self) -> PrintResult<SerialPort> {
        SerialPort::open(&self.path, self.baud_rate)
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.path, e)))
    }
}

impl Printer for SerialPrinter {
    #[instrument(skip(self, data), fields(port = %self.path, baud = self.baud_rate, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let port = self.open()?;

        let write = async {
            let mut written = 0;
            while written < data.len() {
                let n = port.write(&data[written..]).await?;
                if n == 0 {
                    return Err(PrintError::Rejected(format!(
                        "{}: device accepted {} of {} bytes",
                        self.path,
                        written,
                        data.len()
                    )));
                }
                written += n;
            }
            Ok::<(), PrintError>(())
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| PrintError::Timeout(format!("Write timeout: {}", self.path)))??;

        info!("Print data sent");
        Ok(())
    }

    #[instrument(skip(self), fields(port = %self.path))]
    async fn is_online(&self) -> bool {
        match self.open() {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Serial printer unavailable");
                false
            }
        }
    }
}
