//! Connection lifecycle state and front-end notifications

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Connection State
// ============================================================================

/// Lifecycle of one device session
///
/// `Closed -> Opening -> Open`; from `Open`, a close or a dropped link moves
/// to `Reconnecting`, which retries on a fixed interval back to `Open`.
/// `Closed` is also the terminal state after shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Opening,
    Open,
    Reconnecting,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "CLOSED"),
            ConnectionState::Opening => write!(f, "OPENING"),
            ConnectionState::Open => write!(f, "OPEN"),
            ConnectionState::Reconnecting => write!(f, "RECONNECTING"),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Notifications broadcast to front-ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Session established (first open or successful reopen)
    Connected,
    /// Session lost; reconnecting unless shut down
    Disconnected,
    Error(String),
    /// A reopen attempt is starting
    Reopening,
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Counters exposed for health checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub requests: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    pub reconnect_timers_started: u32,
    pub reconnect_timers_cleared: u32,
    pub reopen_attempts: u32,
}

impl Diagnostics {
    /// Number of reconnect timers currently running (0 or 1)
    pub fn active_timers(&self) -> u32 {
        self.reconnect_timers_started - self.reconnect_timers_cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert_eq!(ConnectionState::default(), ConnectionState::Closed);
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Opening.is_open());
        assert!(!ConnectionState::Reconnecting.is_open());
        assert_eq!(ConnectionState::Reconnecting.to_string(), "RECONNECTING");
    }
}
