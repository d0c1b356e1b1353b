//! Configuration for Lodestone
//!
//! Centralized configuration with sensible defaults.

/// Main configuration for a Lodestone server instance
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Upper bound on one readiness wait (milliseconds). The wait is bounded
    /// so a shutdown request is observed within this window.
    pub poll_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:1234".to_string(),
            max_connections: 1024,
            poll_timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address (host:port)
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent client connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Set the readiness wait bound in milliseconds
    pub fn poll_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.poll_timeout_ms = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
