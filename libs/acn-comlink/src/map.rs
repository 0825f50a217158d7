//! ACN register map
//!
//! Static catalog of named registers grouped into banks. Each bank is read
//! and written as one block keyed by its base address; its members are also
//! reachable by name for single-word access.

use crate::objects::ObjectKind;
use crate::register::{CompositeShape, Register, ScalarFormat};

/// Config bank base address
pub const CONFIG_BANK: u16 = 0x0000;
/// Live status bank base address
pub const STATUS_BANK: u16 = 0x0100;
pub const BANK2: u16 = 0x0200;
pub const LOCAL_OUTPUTS: u16 = 0x0300;
pub const REMOTE_OUTPUTS: u16 = 0x0400;

fn config_bank() -> Register {
    use ScalarFormat::{Decimal, Hex16};
    Register::composite(
        "config",
        "Configuration",
        CONFIG_BANK,
        CompositeShape::Record,
        vec![
            Register::scalar("modbusSlaveId", "Slave ID", 0x00, Decimal),
            Register::scalar("channelMap", "Channel Map", 0x01, Hex16),
            Register::scalar("msBetweenStatusTx", "Status Interval", 0x02, Decimal)
                .with_units("ms"),
            Register::scalar("powerOffSec", "Power Off", 0x03, Decimal).with_units("s"),
            Register::scalar("networkFormation", "Formation", 0x04, Decimal),
            Register::scalar("pairingTimeout", "Pairing Timeout", 0x05, Decimal).with_units("s"),
            Register::scalar("switchDefaults", "Switch Defaults", 0x06, Decimal),
            Register::scalar("maxHops", "Max Hops", 0x07, Decimal),
            Register::scalar("slowSpeed", "Slow Speed", 0x08, Hex16),
            Register::scalar("fastSpeed", "Fast Speed", 0x09, Hex16),
        ],
    )
}

fn status_bank() -> Register {
    use ScalarFormat::{BoolArray16, Decimal, LinkQuality, SystemState};
    Register::composite(
        "bank1",
        "Status",
        STATUS_BANK,
        CompositeShape::Record,
        vec![
            Register::scalar("localSwitches", "Local Switches", 0x0100, BoolArray16),
            Register::scalar("remoteSwitches", "Remote Switches", 0x0101, BoolArray16),
            Register::scalar("remoteStatus", "Remote Status", 0x0102, Decimal).read_only(),
            Register::scalar("remoteQuality", "Remote Quality", 0x0103, LinkQuality).read_only(),
            Register::scalar("systemState", "State", 0x0104, SystemState).read_only(),
            Register::scalar("volts", "Volts", 0x0105, Decimal).read_only(),
        ],
    )
}

fn bank2() -> Register {
    Register::composite(
        "bank2",
        "Bank 2",
        BANK2,
        CompositeShape::Record,
        vec![
            Register::scalar("channel", "Channel", 0x0200, ScalarFormat::Decimal).read_only(),
            Register::scalar("fault", "Fault", 0x0201, ScalarFormat::Decimal).read_only(),
        ],
    )
}

fn outputs(
    name: &'static str,
    title: &'static str,
    base: u16,
    members: &[(&'static str, &'static str)],
) -> Register {
    let children = members
        .iter()
        .zip(base..)
        .map(|(&(member, member_title), address)| {
            Register::scalar(member, member_title, address, ScalarFormat::OutputConfig)
        })
        .collect();
    Register::composite(name, title, base, CompositeShape::List, children)
}

/// Named registers of an ACN device
#[derive(Debug, Clone)]
pub struct RegisterMap {
    registers: Vec<Register>,
}

impl RegisterMap {
    /// The standard ACN map
    pub fn acn() -> Self {
        Self {
            registers: vec![
                config_bank(),
                status_bank(),
                bank2(),
                outputs(
                    "localOutputs",
                    "Local Outputs",
                    LOCAL_OUTPUTS,
                    &[("lo0", "Local Output 0"), ("lo1", "Local Output 1")],
                ),
                outputs(
                    "remoteOutputs",
                    "Remote Outputs",
                    REMOTE_OUTPUTS,
                    &[
                        ("ro0", "Remote Output 0"),
                        ("ro1", "Remote Output 1"),
                        ("ro2", "Remote Output 2"),
                    ],
                ),
                Register::object("factoryConfig", "Factory Config", ObjectKind::FactoryConfig),
                Register::object("networkStatus", "Network Status", ObjectKind::NetworkStatus),
                Register::object("scanResult", "Scan Result", ObjectKind::ScanResult),
                Register::object("connectionTable", "Connections", ObjectKind::ConnectionTable),
                Register::object(
                    "coordStatus",
                    "Coordinator Status",
                    ObjectKind::CoordinatorStatus,
                ),
                Register::object("sensorData", "Sensor Data", ObjectKind::SensorData),
            ],
        }
    }

    /// Look up a bank, bank member or object by name
    pub fn get(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find_map(|r| r.find(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Register> {
        self.registers.iter_mut().find_map(|r| r.find_mut(name))
    }

    /// Top-level banks and objects
    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.registers.iter()
    }

    /// Every addressable name, banks followed by their members
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for reg in &self.registers {
            names.push(reg.name());
            names.extend(reg.children().iter().map(Register::name));
        }
        names
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::acn()
    }
}
