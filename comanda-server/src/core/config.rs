use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
///
/// # Environment variables
///
/// Every field can be overridden from the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/comanda | data directory (`print.redb`) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | runtime environment |
/// | LOG_LEVEL | info | log filter |
/// | LOG_DIR | - | optional directory for rolling log files |
/// | PRINT_TIMEOUT_MS | 5000 | device connect/write timeout |
/// | GATEWAY_TIMEOUT_MS | 3000 | order service call timeout |
/// | MAX_PRINT_ATTEMPTS | 3 | `max_attempts` for new jobs |
/// | DISPATCH_INTERVAL_MS | 2000 | dispatcher poll interval |
/// | SYNC_INTERVAL_MS | 5000 | periodic reconciliation interval, 0 disables |
/// | SYNC_RETRY_FAILED | true | synchronizer retries FAILED jobs with budget |
/// | SYNC_ENSURE_JOBS | true | synchronizer enqueues jobs for lines without one |
/// | DEFAULT_PRINTER_ID | - | device for jobs without a pinned printer |
/// | DOUBLE_SIZE_ITEMS | true | print item rows in double size |
/// | TIMEZONE_OFFSET_MINUTES | 0 | offset applied to ticket timestamps |
/// | ORDER_SERVICE_URL | - | remote order service; in-memory gateway when unset |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/comanda HTTP_PORT=8080 DEFAULT_PRINTER_ID=1 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory
    pub work_dir: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,

    // === Printing ===
    pub print_timeout_ms: u64,
    pub max_print_attempts: u32,
    pub dispatch_interval_ms: u64,
    pub default_printer_id: Option<i64>,
    pub double_size_items: bool,
    pub timezone_offset_minutes: i32,

    // === Order synchronization ===
    pub sync_interval_ms: u64,
    pub sync_retry_failed: bool,
    pub sync_ensure_jobs: bool,
    pub gateway_timeout_ms: u64,
    pub order_service_url: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/comanda".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: env_opt("LOG_DIR"),

            print_timeout_ms: env_parse("PRINT_TIMEOUT_MS", 5000),
            max_print_attempts: env_parse("MAX_PRINT_ATTEMPTS", 3).max(1),
            dispatch_interval_ms: env_parse("DISPATCH_INTERVAL_MS", 2000).max(50),
            default_printer_id: env_opt("DEFAULT_PRINTER_ID").and_then(|v| v.parse().ok()),
            double_size_items: env_parse("DOUBLE_SIZE_ITEMS", true),
            timezone_offset_minutes: env_parse("TIMEZONE_OFFSET_MINUTES", 0),

            sync_interval_ms: env_parse("SYNC_INTERVAL_MS", 5000),
            sync_retry_failed: env_parse("SYNC_RETRY_FAILED", true),
            sync_ensure_jobs: env_parse("SYNC_ENSURE_JOBS", true),
            gateway_timeout_ms: env_parse("GATEWAY_TIMEOUT_MS", 3000),
            order_service_url: env_opt("ORDER_SERVICE_URL"),
        }
    }

    /// Override the data directory and port
    ///
    /// Mostly used by tests.
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// Path of the embedded print database
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("print.redb")
    }

    pub fn print_timeout(&self) -> Duration {
        Duration::from_millis(self.print_timeout_ms)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// Periodic reconciliation interval, `None` when disabled
    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync_interval_ms > 0).then(|| Duration::from_millis(self.sync_interval_ms))
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_overrides() {
        let config = Config::with_overrides("/tmp/comanda-test", 4100);
        assert_eq!(config.work_dir, "/tmp/comanda-test");
        assert_eq!(config.http_port, 4100);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/comanda-test/print.redb")
        );
    }

    #[test]
    fn test_sync_interval_zero_disables() {
        let mut config = Config::with_overrides("/tmp", 0);
        config.sync_interval_ms = 0;
        assert!(config.sync_interval().is_none());
        config.sync_interval_ms = 250;
        assert_eq!(config.sync_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_env_parse_falls_back() {
        assert_eq!(env_parse("COMANDA_TEST_UNSET_VARIABLE", 7u32), 7);
    }
}
