//! Device object decoders
//!
//! Objects are variable-shape structures read through the master's object
//! primitive rather than as holding-register blocks. Record arrays are
//! partitioned into fixed-size entries; entries that fail their sentinel or
//! validity check are dropped silently.

use serde::{Deserialize, Serialize};

use crate::bytes::{
    has_flag, mac_to_string, short_address_to_string, string_to_mac, u8_to_bool_array, ByteOrder,
    MAC_LEN,
};
use crate::error::{AcnError, Result};
use crate::reader::BufferReader;
use crate::telemetry::SensorFrame;

// ============================================================================
// Object identifiers
// ============================================================================

/// Objects exposed by ACN firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    FactoryConfig,
    NetworkStatus,
    ScanResult,
    ConnectionTable,
    CoordinatorStatus,
    SensorData,
}

impl ObjectKind {
    /// Object id on the wire
    pub fn id(&self) -> u8 {
        match self {
            Self::FactoryConfig => 0,
            Self::NetworkStatus => 2,
            Self::ScanResult => 3,
            Self::ConnectionTable => 4,
            Self::CoordinatorStatus => 5,
            Self::SensorData => 7,
        }
    }

    /// Whether the host may write this object
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::FactoryConfig)
    }

    /// Decode a raw object response
    pub fn decode(&self, buf: &[u8]) -> Result<ObjectValue> {
        Ok(match self {
            Self::FactoryConfig => ObjectValue::Factory(FactoryConfig::decode(buf)?),
            Self::NetworkStatus => ObjectValue::Network(NetworkStatus::decode(buf)?),
            Self::ScanResult => ObjectValue::Scan(decode_scan_result(buf)),
            Self::ConnectionTable => ObjectValue::Connections(decode_connection_table(buf)),
            Self::CoordinatorStatus => ObjectValue::Coordinator(CoordinatorStatus::decode(buf)?),
            Self::SensorData => ObjectValue::Sensor(SensorFrame::decode(buf)?),
        })
    }
}

/// Decoded contents of a device object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObjectValue {
    Factory(Option<FactoryConfig>),
    Network(NetworkStatus),
    Scan(Vec<ScanEntry>),
    Connections(Vec<ConnectionEntry>),
    Coordinator(CoordinatorStatus),
    Sensor(SensorFrame),
}

impl ObjectValue {
    /// Host-facing JSON representation
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Partition `buf` into `entry_size` records and keep the ones `decode` accepts
///
/// Trailing bytes that do not fill a whole entry are ignored.
pub fn decode_records<T, F>(buf: &[u8], entry_size: usize, decode: F) -> Vec<T>
where
    F: Fn(&[u8]) -> Option<T>,
{
    if entry_size == 0 {
        return Vec::new();
    }
    buf.chunks_exact(entry_size).filter_map(decode).collect()
}

fn le_u16(entry: &[u8], offset: usize) -> u16 {
    ByteOrder::LittleEndian.u16_from([entry[offset], entry[offset + 1]])
}

// ============================================================================
// Factory configuration (object 0)
// ============================================================================

/// Serial number field width
pub const SERIAL_LEN: usize = 20;

/// Encoded size of the factory object
pub const FACTORY_CONFIG_LEN: usize = MAC_LEN + SERIAL_LEN + 1;

/// Characters kept in a stored serial number
fn is_serial_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Identity written into non-volatile memory at manufacture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryConfig {
    pub mac_address: String,
    pub serial_number: String,
    pub product_type: u8,
}

impl FactoryConfig {
    /// Decode object 0; a single zero byte means the device is unprogrammed
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf == [0] {
            return Ok(None);
        }
        if buf.len() != FACTORY_CONFIG_LEN {
            return Err(AcnError::data_integrity(format!(
                "Factory object must be {} bytes, got {}",
                FACTORY_CONFIG_LEN,
                buf.len()
            )));
        }

        let serial_number = buf[MAC_LEN..MAC_LEN + SERIAL_LEN]
            .iter()
            .filter(|b| is_serial_byte(**b))
            .map(|b| char::from(*b))
            .collect();

        Ok(Some(Self {
            mac_address: mac_to_string(&buf[..MAC_LEN]),
            serial_number,
            product_type: buf[FACTORY_CONFIG_LEN - 1],
        }))
    }

    /// Check the fields can be encoded without sending anything
    pub fn validate(&self) -> Result<()> {
        string_to_mac(&self.mac_address)?;
        if !self.serial_number.bytes().all(is_serial_byte) {
            return Err(AcnError::encoding(format!(
                "Serial number '{}' may only contain letters, digits and '_'",
                self.serial_number
            )));
        }
        if self.serial_number.len() > SERIAL_LEN {
            return Err(AcnError::encoding(format!(
                "Serial number longer than {} characters",
                SERIAL_LEN
            )));
        }
        Ok(())
    }

    /// Encode as MAC, NUL-padded serial, product type
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut out = Vec::with_capacity(FACTORY_CONFIG_LEN);
        out.extend_from_slice(&string_to_mac(&self.mac_address)?);
        let mut serial = [0u8; SERIAL_LEN];
        serial[..self.serial_number.len()].copy_from_slice(self.serial_number.as_bytes());
        out.extend_from_slice(&serial);
        out.push(self.product_type);
        Ok(out)
    }

    /// Build from a host JSON value, range-checking the product type
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let product = value
            .get("productType")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| AcnError::encoding("Factory config needs a numeric productType"))?;
        if !(0..=255).contains(&product) {
            return Err(AcnError::encoding(format!(
                "Product type {} out of range 0..=255",
                product
            )));
        }
        let config: FactoryConfig = serde_json::from_value(value.clone())
            .map_err(|e| AcnError::encoding(format!("Invalid factory config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Network status (object 2)
// ============================================================================

pub const NETWORK_STATUS_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub short_address: String,
    pub parent: u8,
    pub pan_id: String,
    pub current_channel: u8,
}

impl NetworkStatus {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != NETWORK_STATUS_LEN {
            return Err(AcnError::data_integrity(format!(
                "Network status must be {} bytes, got {}",
                NETWORK_STATUS_LEN,
                buf.len()
            )));
        }
        Ok(Self {
            short_address: short_address_to_string(le_u16(buf, 0)),
            parent: buf[2],
            pan_id: short_address_to_string(le_u16(buf, 3)),
            current_channel: buf[5],
        })
    }
}

// ============================================================================
// Scan result (object 3)
// ============================================================================

pub const SCAN_ENTRY_LEN: usize = 15;

/// Capability byte advertised by a beaconing node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    pub role: u8,
    pub sleep: bool,
    pub security_enable: bool,
    pub repeat_enable: bool,
    pub allow_join: bool,
    pub direct: bool,
    pub alt_source_address: bool,
}

impl From<u8> for Capability {
    fn from(byte: u8) -> Self {
        Self {
            role: byte & 0x03,
            sleep: has_flag(byte, 0x04),
            security_enable: has_flag(byte, 0x08),
            repeat_enable: has_flag(byte, 0x10),
            allow_join: has_flag(byte, 0x20),
            direct: has_flag(byte, 0x40),
            alt_source_address: has_flag(byte, 0x80),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    pub channel: u8,
    pub address: String,
    pub pan_id: String,
    pub rssi: u8,
    pub lqi: u8,
    pub capability: Capability,
    pub peer_info: u8,
}

impl ScanEntry {
    /// Channel 0 and 255 mark unused slots
    pub fn decode(entry: &[u8]) -> Option<Self> {
        let channel = entry[0];
        if channel == 0 || channel == 255 {
            return None;
        }
        Some(Self {
            channel,
            address: mac_to_string(&entry[1..1 + MAC_LEN]),
            pan_id: short_address_to_string(le_u16(entry, 9)),
            rssi: entry[11],
            lqi: entry[12],
            capability: Capability::from(entry[13]),
            peer_info: entry[14],
        })
    }
}

pub fn decode_scan_result(buf: &[u8]) -> Vec<ScanEntry> {
    decode_records(buf, SCAN_ENTRY_LEN, ScanEntry::decode)
}

// ============================================================================
// Connection table (object 4)
// ============================================================================

pub const CONNECTION_ENTRY_LEN: usize = 14;

/// Status byte of a connection table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatus {
    pub rx_on_when_idle: bool,
    pub direct_connection: bool,
    pub long_address_valid: bool,
    pub short_address_valid: bool,
    pub finish_join: bool,
    pub is_family: bool,
    pub is_valid: bool,
}

impl From<u8> for LinkStatus {
    fn from(byte: u8) -> Self {
        Self {
            rx_on_when_idle: has_flag(byte, 0x01),
            direct_connection: has_flag(byte, 0x02),
            long_address_valid: has_flag(byte, 0x04),
            short_address_valid: has_flag(byte, 0x08),
            finish_join: has_flag(byte, 0x10),
            is_family: has_flag(byte, 0x20),
            is_valid: has_flag(byte, 0x80),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEntry {
    pub pan_id: String,
    pub alt_address: String,
    pub address: String,
    pub status: LinkStatus,
    pub extra: u8,
}

impl ConnectionEntry {
    /// Slots without the validity bit are skipped
    pub fn decode(entry: &[u8]) -> Option<Self> {
        let status = LinkStatus::from(entry[12]);
        if !status.is_valid {
            return None;
        }
        Some(Self {
            pan_id: short_address_to_string(le_u16(entry, 0)),
            alt_address: short_address_to_string(le_u16(entry, 2)),
            address: mac_to_string(&entry[4..4 + MAC_LEN]),
            status,
            extra: entry[13],
        })
    }
}

pub fn decode_connection_table(buf: &[u8]) -> Vec<ConnectionEntry> {
    decode_records(buf, CONNECTION_ENTRY_LEN, ConnectionEntry::decode)
}

// ============================================================================
// Coordinator status (object 5)
// ============================================================================

const ROUTE_COUNT: usize = 8;
pub const COORDINATOR_STATUS_LEN: usize = ROUTE_COUNT * 2 + 2;

/// Network role of a node
pub fn role_to_string(role: u8) -> &'static str {
    match role {
        0 => "End Device",
        1 => "Coordinator",
        2 => "Net Coordinator",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub to: u8,
    pub next_hop: u8,
    pub errors: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorStatus {
    pub role: u8,
    pub role_type: String,
    pub known: Vec<bool>,
    pub route: Vec<Route>,
}

impl CoordinatorStatus {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != COORDINATOR_STATUS_LEN {
            return Err(AcnError::data_integrity(format!(
                "Coordinator status must be {} bytes, got {}",
                COORDINATOR_STATUS_LEN,
                buf.len()
            )));
        }
        let mut reader = BufferReader::new(buf);
        let next_hops = reader.bytes(ROUTE_COUNT)?;
        let errors = reader.bytes(ROUTE_COUNT)?;
        let coordinators = reader.u8()?;
        let role = reader.u8()?;

        let route = next_hops
            .iter()
            .zip(errors)
            .enumerate()
            .map(|(i, (&next_hop, &errors))| Route {
                to: i as u8,
                next_hop,
                errors,
            })
            .collect();

        Ok(Self {
            role,
            role_type: role_to_string(role).to_string(),
            known: u8_to_bool_array(coordinators).to_vec(),
            route,
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde_json::json;

    fn scan_entry(channel: u8, mac_tail: u8, capability: u8) -> Vec<u8> {
        let mut e = vec![channel];
        e.extend_from_slice(&[0x00, 0x13, 0xA2, 0x00, 0x40, 0x00, 0x00, mac_tail]);
        e.extend_from_slice(&[0xCD, 0xAB]); // pan id
        e.extend_from_slice(&[200, 90, capability, 7]);
        e
    }

    fn connection_entry(status: u8) -> Vec<u8> {
        let mut e = vec![0x34, 0x12, 0x78, 0x56];
        e.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        e.push(status);
        e.push(0x42);
        e
    }

    #[test]
    fn test_network_status_example() {
        let value = ObjectKind::NetworkStatus
            .decode(&[0x34, 0x12, 0x07, 0xCD, 0xAB, 0x0B])
            .unwrap();
        assert_eq!(
            value.to_json(),
            json!({"shortAddress": "1234", "parent": 7, "panId": "abcd", "currentChannel": 11})
        );
    }

    #[test]
    fn test_network_status_wrong_length() {
        let err = NetworkStatus::decode(&[0x34, 0x12, 0x07]).unwrap_err();
        assert!(matches!(err, AcnError::DataIntegrity(_)));
    }

    #[test]
    fn test_scan_filters_unused_channels() {
        let mut buf = scan_entry(0, 0x01, 0);
        buf.extend(scan_entry(6, 0x02, 0x25));
        buf.extend(scan_entry(255, 0x03, 0));

        let entries = decode_scan_result(&buf);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.channel, 6);
        // address comes from this entry, not the first slot
        assert_eq!(entry.address, "00:13:a2:00:40:00:00:02");
        assert_eq!(entry.pan_id, "abcd");
        assert_eq!(entry.rssi, 200);
        assert_eq!(entry.lqi, 90);
        assert_eq!(entry.peer_info, 7);
        assert_eq!(entry.capability.role, 1);
        assert!(entry.capability.sleep);
        assert!(entry.capability.allow_join);
        assert!(!entry.capability.security_enable);
    }

    #[test]
    fn test_scan_ignores_partial_entry() {
        let mut buf = scan_entry(11, 0x01, 0);
        buf.extend_from_slice(&[11, 1, 2, 3]);
        assert_eq!(decode_scan_result(&buf).len(), 1);
        assert!(decode_scan_result(&[]).is_empty());
    }

    #[test]
    fn test_capability_is_total() {
        for byte in 0..=u8::MAX {
            let cap = Capability::from(byte);
            assert!(cap.role <= 3);
            assert_eq!(cap.alt_source_address, byte >= 0x80);
        }
    }

    #[test]
    fn test_connection_table_validity_bit() {
        let mut buf = connection_entry(0x80 | 0x01 | 0x08);
        buf.extend(connection_entry(0x7F));
        buf.extend(connection_entry(0x80));

        let entries = decode_connection_table(&buf);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pan_id, "1234");
        assert_eq!(entries[0].alt_address, "5678");
        assert_eq!(entries[0].address, "01:02:03:04:05:06:07:08");
        assert!(entries[0].status.rx_on_when_idle);
        assert!(entries[0].status.short_address_valid);
        assert!(!entries[0].status.is_family);
        assert_eq!(entries[0].extra, 0x42);
        assert!(entries.iter().all(|e| e.status.is_valid));
    }

    #[test]
    fn test_coordinator_status() {
        let mut buf: Vec<u8> = (10..18).collect();
        buf.extend(0..8u8);
        buf.push(0b0000_0101);
        buf.push(1);

        let status = CoordinatorStatus::decode(&buf).unwrap();
        assert_eq!(status.role, 1);
        assert_eq!(status.role_type, "Coordinator");
        assert_eq!(
            status.known,
            vec![true, false, true, false, false, false, false, false]
        );
        assert_eq!(status.route.len(), 8);
        assert_eq!(
            status.route[3],
            Route {
                to: 3,
                next_hop: 13,
                errors: 3
            }
        );

        assert!(CoordinatorStatus::decode(&buf[..17]).is_err());
        assert_eq!(role_to_string(9), "Unknown");
    }

    #[test]
    fn test_factory_config_decode() {
        assert_eq!(FactoryConfig::decode(&[0]).unwrap(), None);
        assert!(matches!(
            FactoryConfig::decode(&[1, 2, 3]),
            Err(AcnError::DataIntegrity(_))
        ));

        let config = FactoryConfig {
            mac_address: "00:13:a2:00:40:0a:0b:0c".to_string(),
            serial_number: "ACN000123".to_string(),
            product_type: 3,
        };
        let buf = config.encode().unwrap();
        assert_eq!(buf.len(), FACTORY_CONFIG_LEN);
        assert_eq!(&buf[8..17], b"ACN000123");
        assert!(buf[17..28].iter().all(|b| *b == 0));
        assert_eq!(FactoryConfig::decode(&buf).unwrap(), Some(config));
    }

    #[test]
    fn test_factory_config_validation() {
        let too_long = FactoryConfig {
            mac_address: "00:00:00:00:00:00:00:01".to_string(),
            serial_number: "X".repeat(21),
            product_type: 0,
        };
        assert!(matches!(too_long.encode(), Err(AcnError::Encoding(_))));

        let bad = json!({
            "macAddress": "00:00:00:00:00:00:00:01",
            "serialNumber": "A1",
            "productType": 256
        });
        assert!(FactoryConfig::from_json(&bad).is_err());

        let bad_mac = json!({
            "macAddress": "00:00:00:01",
            "serialNumber": "A1",
            "productType": 1
        });
        assert!(FactoryConfig::from_json(&bad_mac).is_err());

        let good = json!({
            "macAddress": "00:00:00:00:00:00:00:01",
            "serialNumber": "A1",
            "productType": 255
        });
        assert_eq!(FactoryConfig::from_json(&good).unwrap().product_type, 255);
    }

    #[test]
    fn test_serial_must_survive_decode() {
        for serial in ["ACN-1", "ACN 1", "ACN.1", "Ünit"] {
            let config = FactoryConfig {
                mac_address: "00:13:a2:00:40:0a:0b:0c".to_string(),
                serial_number: serial.to_string(),
                product_type: 1,
            };
            assert!(
                matches!(config.validate(), Err(AcnError::Encoding(_))),
                "{}",
                serial
            );
        }

        for serial in ["", "A", "ACN_0001", "abcDEF0123456789_xyz"] {
            let config = FactoryConfig {
                mac_address: "00:13:a2:00:40:0a:0b:0c".to_string(),
                serial_number: serial.to_string(),
                product_type: 9,
            };
            let buf = config.encode().unwrap();
            assert_eq!(FactoryConfig::decode(&buf).unwrap(), Some(config));
        }
    }

    #[test]
    fn test_scan_count_matches_valid_channels() {
        // every channel byte, in runs of varying length with a partial tail
        for run in 1..=7usize {
            for start in (0..=255u8).step_by(run * 11) {
                let channels: Vec<u8> =
                    (0..run).map(|i| start.wrapping_add((i * 37) as u8)).collect();
                let mut buf: Vec<u8> = channels
                    .iter()
                    .flat_map(|c| scan_entry(*c, *c, 0))
                    .collect();
                buf.extend_from_slice(&[6u8; SCAN_ENTRY_LEN - 1][..run]);

                let expected = channels.iter().filter(|c| **c != 0 && **c != 255).count();
                let entries = decode_scan_result(&buf);
                assert_eq!(entries.len(), expected, "channels {:?}", channels);
                for entry in &entries {
                    assert!(entry.channel != 0 && entry.channel != 255);
                    assert!(entry.address.ends_with(&format!("{:02x}", entry.channel)));
                }
            }
        }
    }

    #[test]
    fn test_connection_count_matches_valid_bit() {
        for status in 0..=255u8 {
            for run in 1..=3usize {
                let statuses: Vec<u8> = (0..run)
                    .map(|i| status.wrapping_add(i as u8 * 0x40))
                    .collect();
                let mut buf: Vec<u8> =
                    statuses.iter().flat_map(|s| connection_entry(*s)).collect();
                buf.push(0x80);

                let expected = statuses.iter().filter(|s| **s & 0x80 != 0).count();
                assert_eq!(
                    decode_connection_table(&buf).len(),
                    expected,
                    "statuses {:?}",
                    statuses
                );
            }
        }
    }

    #[test]
    fn test_object_ids() {
        let ids: Vec<u8> = [
            ObjectKind::FactoryConfig,
            ObjectKind::NetworkStatus,
            ObjectKind::ScanResult,
            ObjectKind::ConnectionTable,
            ObjectKind::CoordinatorStatus,
            ObjectKind::SensorData,
        ]
        .iter()
        .map(ObjectKind::id)
        .collect();
        assert_eq!(ids, vec![0, 2, 3, 4, 5, 7]);
        assert!(ObjectKind::FactoryConfig.is_writable());
        assert!(!ObjectKind::ScanResult.is_writable());
    }
}
