//! ACN Link Error Types
//!
//! Failures surface to the immediate caller of a request. Only transport
//! drops are recovered internally (by the reconnect loop).

use thiserror::Error;

/// Result type for acn-comlink operations
pub type Result<T> = std::result::Result<T, AcnError>;

/// ACN link errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AcnError {
    /// Serial device missing or busy
    #[error("Open failed: {0}")]
    Open(String),

    /// Negative acknowledgement from the device
    #[error("Exception 0x{code:02X} ({})", exception_name(*.code))]
    Exception { code: u8 },

    /// Response does not match the declared shape of the register
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Host value cannot be encoded into the register
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Caller supplied an unknown name or out-of-range parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Timeout reported by the transport
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Device accepted the frame but reported a non-zero write status
    #[error("Write rejected with status {status}")]
    WriteRejected { status: u8 },

    /// Register cannot be written from the host
    #[error("Register is read-only: {0}")]
    ReadOnly(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Human-readable name for standard MODBUS exception codes
pub fn exception_name(code: u8) -> &'static str {
    match code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        0x07 => "Negative Acknowledge",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Failed to Respond",
        _ => "Unknown Exception",
    }
}

impl From<serde_json::Error> for AcnError {
    fn from(err: serde_json::Error) -> Self {
        AcnError::Encoding(format!("JSON error: {}", err))
    }
}

impl From<common::Error> for AcnError {
    fn from(err: common::Error) -> Self {
        AcnError::Config(err.to_string())
    }
}

// Helper methods for creating errors
impl AcnError {
    pub fn open(msg: impl Into<String>) -> Self {
        AcnError::Open(msg.into())
    }

    pub fn data_integrity(msg: impl Into<String>) -> Self {
        AcnError::DataIntegrity(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        AcnError::Encoding(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        AcnError::InvalidArgument(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        AcnError::InvalidState(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        AcnError::Transport(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        AcnError::Timeout(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        AcnError::Config(msg.into())
    }

    /// Exception code carried by a device negative acknowledgement
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            AcnError::Exception { code } => Some(*code),
            _ => None,
        }
    }

    /// Rejected before anything was sent to the device
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AcnError::Encoding(_)
                | AcnError::InvalidArgument(_)
                | AcnError::ReadOnly(_)
                | AcnError::InvalidState(_)
        )
    }

    /// Check if this error indicates the link dropped
    pub fn needs_reconnect(&self) -> bool {
        match self {
            AcnError::Transport(msg) => {
                msg.contains("Broken pipe")
                    || msg.contains("disconnected")
                    || msg.contains("No such device")
            },
            AcnError::Open(_) | AcnError::NotConnected => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_display() {
        let err = AcnError::Exception { code: 0x02 };
        assert_eq!(err.to_string(), "Exception 0x02 (Illegal Data Address)");
        assert_eq!(err.exception_code(), Some(2));

        let err = AcnError::Exception { code: 0x42 };
        assert_eq!(err.to_string(), "Exception 0x42 (Unknown Exception)");
    }

    #[test]
    fn test_classification() {
        assert!(AcnError::invalid_argument("bogus").is_caller_error());
        assert!(AcnError::encoding("bad mac").is_caller_error());
        assert!(!AcnError::Exception { code: 1 }.is_caller_error());
        assert!(!AcnError::data_integrity("short").is_caller_error());

        assert!(AcnError::NotConnected.needs_reconnect());
        assert!(AcnError::open("busy").needs_reconnect());
        assert!(AcnError::transport("port disconnected").needs_reconnect());
        assert!(!AcnError::Exception { code: 4 }.needs_reconnect());
    }
}
