//! Per-port structured logging

use tracing::{debug, info, warn};

use crate::state::ConnectionState;

/// Lifecycle logger bound to one serial port
#[derive(Debug, Clone)]
pub struct PortLogger {
    pub port_name: String,
}

impl PortLogger {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
        }
    }

    /// Log connection attempt
    pub fn log_connect(&self, details: &str) {
        info!("[CONNECT] {} - {}", self.port_name, details);
    }

    /// Log connection status change
    pub fn log_status(&self, old_state: ConnectionState, new_state: ConnectionState, reason: &str) {
        info!(
            "[STATUS] {} {} -> {} - {}",
            self.port_name, old_state, new_state, reason
        );
    }

    /// Log reopen attempt
    pub fn log_retry(&self, attempt: u32, interval_ms: u64, reason: &str) {
        warn!(
            "[RETRY] {} attempt {}, every {}ms - {}",
            self.port_name, attempt, interval_ms, reason
        );
    }

    pub fn log_tx(&self, kind: &str, payload: &[u8]) {
        debug!(
            "[TX] {} {} [{}]",
            self.port_name,
            kind,
            common::hex::encode_spaced(payload)
        );
    }

    pub fn log_rx(&self, kind: &str, payload: &[u8]) {
        debug!(
            "[RX] {} {} [{}]",
            self.port_name,
            kind,
            common::hex::encode_spaced(payload)
        );
    }
}
