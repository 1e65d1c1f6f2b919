// ABOUTME: SMPP keep-alive configuration and failure accounting for enquire_link probing
// ABOUTME: The session's enquire_link loop consults the manager to decide when the peer is dead

use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for periodic enquire_link probing
///
/// # Example
///
/// ```rust
/// use smpp_receiver::client::KeepAliveConfig;
/// use std::time::Duration;
///
/// // Default configuration (30s interval, 10s timeout, first failure is fatal)
/// let config = KeepAliveConfig::default();
///
/// // Custom configuration
/// let config = KeepAliveConfig::new(Duration::from_millis(500))
///     .with_timeout(Duration::from_secs(1))
///     .with_max_failures(3);
/// ```
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between enquire_link PDUs (default: 30 seconds)
    pub interval: Duration,

    /// Timeout for each enquire_link_resp (default: 10 seconds)
    pub timeout: Duration,

    /// Consecutive failures after which the peer is considered dead
    /// (default: 1)
    pub max_failures: u32,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            max_failures: 1,
        }
    }
}

impl KeepAliveConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }
}

/// Snapshot of keep-alive health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveStatus {
    pub consecutive_failures: u32,
    pub total_pings: u32,
    pub total_pongs: u32,
}

/// Tracks enquire_link outcomes for one session
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,
    consecutive_failures: u32,
    total_pings: u32,
    total_pongs: u32,
}

impl KeepAliveManager {
    pub fn new(config: KeepAliveConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            total_pings: 0,
            total_pongs: 0,
        }
    }

    pub fn on_ping_sent(&mut self) {
        self.total_pings += 1;
        debug!("Enquire_link sent (total: {})", self.total_pings);
    }

    pub fn on_ping_success(&mut self) {
        self.consecutive_failures = 0;
        self.total_pongs += 1;
        debug!("Enquire_link answered (total: {})", self.total_pongs);
    }

    pub fn on_ping_failure(&mut self) {
        self.consecutive_failures += 1;
        warn!(
            "Enquire_link failed (consecutive failures: {})",
            self.consecutive_failures
        );
    }

    /// True once `max_failures` consecutive probes have failed
    pub fn is_connection_failed(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
    }

    pub fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            consecutive_failures: self.consecutive_failures,
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }
}
