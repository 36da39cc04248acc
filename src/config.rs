use crate::error::ServerResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    // Network configuration
    pub listen_address: String,
    pub port: u16,
    pub backlog_size: u32,

    // Request processing
    pub request_timeout_ms: u64,
    pub parallel_request_limit: usize,
    pub read_buffer_size: usize,

    // Metrics batching
    pub metrics: MetricsConfig,
}

/// Configuration for the batch metrics pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub queue_capacity: usize,
    pub batch_limit: usize,
    pub flush_interval_ms: u64,
    pub flush_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            port: 8080,
            backlog_size: 1024,

            request_timeout_ms: 30_000,
            parallel_request_limit: 64,
            read_buffer_size: 256,

            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            batch_limit: 500,
            flush_interval_ms: 60_000,
            flush_timeout_ms: 2_000,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address and port to listen on
    pub fn with_address(mut self, address: &str, port: u16) -> Self {
        self.listen_address = address.to_string();
        self.port = port;
        self
    }

    /// Set the per-request deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the maximum number of requests processed concurrently
    pub fn with_parallel_request_limit(mut self, limit: usize) -> Self {
        self.parallel_request_limit = limit;
        self
    }

    /// Set the listen socket backlog size
    pub fn with_backlog_size(mut self, backlog: u32) -> Self {
        self.backlog_size = backlog;
        self
    }

    /// Get the full address string (address:port)
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ServerResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_json_file<P: AsRef<Path>>(&self, path: P) -> ServerResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl MetricsConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}
