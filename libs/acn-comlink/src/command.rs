//! Command vocabulary and payloads
//!
//! Symbolic command names resolve to the integer codes understood by the
//! device, in vocabulary order. Unknown names are rejected before anything is
//! sent.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;

use crate::bytes::ByteOrder;
use crate::error::{AcnError, Result};

/// Device commands, in code order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Reset,
    Save,
    Restore,
    Pair,
    Clear,
    Broadcast,
    Scan,
    Ping,
    Unlock,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Command::Reset,
        Command::Save,
        Command::Restore,
        Command::Pair,
        Command::Clear,
        Command::Broadcast,
        Command::Scan,
        Command::Ping,
        Command::Unlock,
    ];

    /// Code sent to the device
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Reset => "reset",
            Command::Save => "save",
            Command::Restore => "restore",
            Command::Pair => "pair",
            Command::Clear => "clear",
            Command::Broadcast => "broadcast",
            Command::Scan => "scan",
            Command::Ping => "ping",
            Command::Unlock => "unlock",
        }
    }

    /// Every accepted command name
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Command::name).collect()
    }
}

impl FromStr for Command {
    type Err = AcnError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| AcnError::invalid_argument(format!("Unknown command '{}'", s)))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Key sent with the unlock command
pub const UNLOCK_KEY: [u8; 2] = [0x55, 0xAA];

/// Energy (noise) scan, active beacon scan, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanType {
    #[default]
    Noise = 1,
    Active = 2,
    Both = 3,
}

impl ScanType {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl FromStr for ScanType {
    type Err = AcnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "noise" => Ok(ScanType::Noise),
            "active" => Ok(ScanType::Active),
            "both" => Ok(ScanType::Both),
            _ => Err(AcnError::invalid_argument(format!("Unknown scan type '{}'", s))),
        }
    }
}

pub fn scan_payload(scan_type: ScanType, duration: u8) -> Vec<u8> {
    vec![scan_type.code(), duration]
}

pub fn ping_payload(address: u16) -> Vec<u8> {
    ByteOrder::LittleEndian.u16_to(address).to_vec()
}

// ============================================================================
// Replies
// ============================================================================

/// Raw outcome of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub command: Command,
    pub values: Bytes,
}

/// Link quality of a ping round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PingReply {
    pub rssi: u8,
    pub lqi: u8,
}

impl PingReply {
    pub fn decode(values: &[u8]) -> Result<Self> {
        match values {
            [rssi, lqi, ..] => Ok(Self {
                rssi: *rssi,
                lqi: *lqi,
            }),
            _ => Err(AcnError::data_integrity(format!(
                "Ping reply needs 2 bytes, got {}",
                values.len()
            ))),
        }
    }
}

/// Report Slave ID response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaveId {
    pub product_type: u8,
    pub run: bool,
    pub version: String,
    pub extra: Vec<u8>,
}

impl SlaveId {
    /// Layout: product type, run indicator (0xFF = running), major, minor, patch, extra
    pub fn decode(values: &[u8]) -> Result<Self> {
        match values {
            [product_type, run, major, minor, patch, extra @ ..] => Ok(Self {
                product_type: *product_type,
                run: *run == 0xFF,
                version: format!("{}.{}.{}", major, minor, patch),
                extra: extra.to_vec(),
            }),
            _ => Err(AcnError::data_integrity(format!(
                "Slave ID needs at least 5 bytes, got {}",
                values.len()
            ))),
        }
    }
}
