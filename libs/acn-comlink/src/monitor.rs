//! Last-known device status for long-running front-ends
//!
//! [`DeviceMonitor`] keeps one snapshot per connection and reports only the
//! sections that changed since the previous read. Sensor messages are events,
//! not state, so they are reported every time one is present.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::objects::ObjectValue;
use crate::transport::AcnMaster;

/// Part of the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    SlaveId,
    NetworkStatus,
    ScanResult,
    ConnectionTable,
    CoordStatus,
    Status,
    SensorData,
}

impl Section {
    /// Registers refreshed by [`DeviceMonitor::inspect`]
    const INSPECTED: [(Section, &'static str); 4] = [
        (Section::NetworkStatus, "networkStatus"),
        (Section::ScanResult, "scanResult"),
        (Section::ConnectionTable, "connectionTable"),
        (Section::CoordStatus, "coordStatus"),
    ];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::SlaveId => "slaveId",
            Section::NetworkStatus => "networkStatus",
            Section::ScanResult => "scanResult",
            Section::ConnectionTable => "connectionTable",
            Section::CoordStatus => "coordStatus",
            Section::Status => "status",
            Section::SensorData => "sensorData",
        };
        write!(f, "{}", name)
    }
}

/// A changed section and its new host value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorUpdate {
    pub section: Section,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub slave_id: Option<Value>,
    pub network_status: Option<Value>,
    pub scan_result: Option<Value>,
    pub connection_table: Option<Value>,
    pub coord_status: Option<Value>,
    pub status: Option<Value>,
}

impl DeviceSnapshot {
    fn slot(&mut self, section: Section) -> Option<&mut Option<Value>> {
        match section {
            Section::SlaveId => Some(&mut self.slave_id),
            Section::NetworkStatus => Some(&mut self.network_status),
            Section::ScanResult => Some(&mut self.scan_result),
            Section::ConnectionTable => Some(&mut self.connection_table),
            Section::CoordStatus => Some(&mut self.coord_status),
            Section::Status => Some(&mut self.status),
            Section::SensorData => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DeviceMonitor {
    snapshot: DeviceSnapshot,
}

impl DeviceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &DeviceSnapshot {
        &self.snapshot
    }

    /// Forget everything; called when the device disconnects
    pub fn reset(&mut self) {
        self.snapshot = DeviceSnapshot::default();
    }

    /// Store `value`, returning an update if it differs from the snapshot
    fn record(&mut self, section: Section, value: Value) -> Option<MonitorUpdate> {
        let slot = self.snapshot.slot(section)?;
        if slot.as_ref() == Some(&value) {
            return None;
        }
        *slot = Some(value.clone());
        Some(MonitorUpdate { section, value })
    }

    /// Read identity and network objects
    ///
    /// A failed read is logged and leaves that section unchanged.
    pub async fn inspect<M: AcnMaster>(&mut self, conn: &mut Connection<M>) -> Vec<MonitorUpdate> {
        let mut updates = Vec::new();

        match conn.get_slave_id().await {
            Ok(id) => match serde_json::to_value(&id) {
                Ok(value) => updates.extend(self.record(Section::SlaveId, value)),
                Err(e) => warn!("Slave ID not representable: {}", e),
            },
            Err(e) => warn!("Read slave ID on {}: {}", conn.port_name(), e),
        }

        for (section, name) in Section::INSPECTED {
            match conn.read(name).await {
                Ok(reg) => {
                    let value = reg.format();
                    updates.extend(self.record(section, value));
                },
                Err(e) => warn!("Read {} on {}: {}", name, conn.port_name(), e),
            }
        }

        debug!("Inspect {}: {} changed", conn.port_name(), updates.len());
        updates
    }

    /// Read the status bank and any pending sensor message
    pub async fn poll<M: AcnMaster>(&mut self, conn: &mut Connection<M>) -> Vec<MonitorUpdate> {
        let mut updates = Vec::new();

        match conn.read("bank1").await {
            Ok(reg) => {
                let value = reg.format();
                updates.extend(self.record(Section::Status, value));
            },
            Err(e) => warn!("Read status on {}: {}", conn.port_name(), e),
        }

        match conn.read("sensorData").await {
            Ok(reg) => {
                if let Some(ObjectValue::Sensor(frame)) = reg.object_value() {
                    if frame.is_message() {
                        updates.push(MonitorUpdate {
                            section: Section::SensorData,
                            value: reg.format(),
                        });
                    }
                }
            },
            Err(e) => warn!("Read sensor data on {}: {}", conn.port_name(), e),
        }

        updates
    }
}
