//! External master contract
//!
//! The request/response framing and the serial port belong to a MODBUS-style
//! master supplied by the caller. This module defines what the connection
//! needs from it: open/close, one request primitive, and a stream of
//! link-level events.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// One transaction against the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterRequest {
    ReportSlaveId,
    ReadRegisters { address: u16, count: u16 },
    WriteRegisters { address: u16, values: Bytes },
    ReadObject { id: u8 },
    WriteObject { id: u8, values: Bytes },
    Command { code: u8, payload: Bytes },
    ReadFifo8 { id: u8, max: u8 },
}

impl MasterRequest {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReportSlaveId => "report_slave_id",
            Self::ReadRegisters { .. } => "read_registers",
            Self::WriteRegisters { .. } => "write_registers",
            Self::ReadObject { .. } => "read_object",
            Self::WriteObject { .. } => "write_object",
            Self::Command { .. } => "command",
            Self::ReadFifo8 { .. } => "read_fifo8",
        }
    }

    /// Outgoing data bytes, if any
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::WriteRegisters { values, .. } | Self::WriteObject { values, .. } => &values[..],
            Self::Command { payload, .. } => &payload[..],
            _ => &[],
        }
    }
}

/// Completed transaction as reported by the master
///
/// A transaction the master considers complete may still carry an exception
/// code from the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterResponse {
    pub values: Option<Bytes>,
    pub exception_code: Option<u8>,
    pub status: Option<u8>,
}

impl MasterResponse {
    pub fn with_values(values: impl Into<Bytes>) -> Self {
        Self {
            values: Some(values.into()),
            ..Default::default()
        }
    }

    pub fn exception(code: u8) -> Self {
        Self {
            exception_code: Some(code),
            ..Default::default()
        }
    }

    pub fn with_status(status: u8) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Link-level notifications raised by the master's transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Close,
    Error(String),
    /// The physical link dropped
    Disconnected,
}

impl fmt::Display for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::Error(e) => write!(f, "error: {}", e),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// MODBUS-style master driving one serial port
///
/// The master serializes requests; at most one transaction is in flight.
/// Timeouts are the master's responsibility and surface as errors.
#[async_trait]
pub trait AcnMaster: Send {
    /// Open the port, resolving once the session is established
    async fn open(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    /// Attach to the event stream of the current physical handle
    ///
    /// Called again after a disconnect, since the handle may have changed.
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransportEvent>;

    async fn request(&mut self, request: MasterRequest) -> Result<MasterResponse>;
}
