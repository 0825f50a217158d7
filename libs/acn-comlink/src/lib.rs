//! Host-side client for ACN wireless nodes
//!
//! Two layers:
//! - a register codec: the named register map, scalar and composite value
//!   formatting, and the binary layouts of the device objects
//! - a connection manager that runs on top of a MODBUS-style master
//!   ([`AcnMaster`]), issues requests and keeps the session alive across
//!   link drops
//!
//! ```rust,ignore
//! let mut conn = Connection::new(master, ConnectionOptions::new("/dev/ttyUSB0"));
//! conn.open().await?;
//! let bank = conn.read("bank1").await?.format();
//! while let Some(event) = conn.next_event().await { /* ... */ }
//! ```

pub mod bytes;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod logger;
pub mod map;
pub mod monitor;
pub mod objects;
pub mod reader;
pub mod register;
pub mod state;
pub mod telemetry;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use command::{Command, CommandReply, PingReply, ScanType, SlaveId};
pub use config::AcnConfig;
pub use connection::{Connection, ConnectionOptions};
pub use error::{AcnError, Result};
pub use map::RegisterMap;
pub use monitor::{DeviceMonitor, MonitorUpdate, Section};
pub use objects::{FactoryConfig, NetworkStatus, ObjectKind, ObjectValue};
pub use register::{Access, AddressSpace, Register, ScalarFormat};
pub use state::{ConnectionEvent, ConnectionState, Diagnostics};
pub use telemetry::SensorFrame;
pub use transport::{AcnMaster, MasterRequest, MasterResponse, TransportEvent};
