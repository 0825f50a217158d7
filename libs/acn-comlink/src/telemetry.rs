//! Asynchronous sensor telemetry (object 7)
//!
//! Frame layout: a 40-byte payload area whose first byte selects the report
//! type, followed by a 6-byte trailer describing the radio message. Frames
//! shorter than [`MIN_FRAME_LEN`] carry no message.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::bytes::{
    coordinate_degrees, cs1108_hours, cs1108_serial, cs1108_voltage, ehpe_metres,
    short_address_to_string, ByteOrder,
};
use crate::error::Result;
use crate::reader::BufferReader;

/// Payload area preceding the trailer
pub const PAYLOAD_LEN: usize = 40;

/// Payload plus trailer
pub const MIN_FRAME_LEN: usize = PAYLOAD_LEN + 6;

const CONTROLLER_REPORT: u8 = 1;
const GPS_REPORT: u8 = 2;

// ============================================================================
// Report payloads
// ============================================================================

/// Controller run meters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meters {
    pub hours: f64,
    pub no_float: u8,
    pub low_bat_min: u8,
    pub low_bat_hrs: u8,
    pub overtemp: u8,
    pub throt_fail: u8,
}

/// Charger state byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFlags {
    pub charging: u8,
    pub charge_mode: String,
    pub in_use: bool,
}

impl From<u8> for StateFlags {
    fn from(byte: u8) -> Self {
        let charging = byte & 0x0F;
        let charge_mode = match charging {
            1 => "Pre-charge",
            2 => "Bulk",
            4 => "Overcharge",
            8 => "Float Charge",
            _ => "Not Charging",
        };
        Self {
            charging,
            charge_mode: charge_mode.to_string(),
            in_use: byte & 0x10 != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerReport {
    pub datatype: u8,
    pub serial: String,
    pub fault_log: Vec<u8>,
    pub meters: Meters,
    pub current_fault: u8,
    pub battery_voltage: f64,
    pub state_flags: StateFlags,
}

impl ControllerReport {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let serial = cs1108_serial(&reader.array::<4>()?);
        let fault_log = reader.bytes(16)?.to_vec();
        let fraction = reader.u16(ByteOrder::LittleEndian)?;
        let hours = reader.u16(ByteOrder::LittleEndian)?;
        let meters = Meters {
            hours: cs1108_hours(fraction, hours),
            no_float: reader.u8()?,
            low_bat_min: reader.u8()?,
            low_bat_hrs: reader.u8()?,
            overtemp: reader.u8()?,
            throt_fail: reader.u8()?,
        };
        let current_fault = reader.u8()?;
        let battery_voltage = cs1108_voltage(reader.u16(ByteOrder::BigEndian)?);
        let state_flags = StateFlags::from(reader.u8()?);

        Ok(Self {
            datatype: CONTROLLER_REPORT,
            serial,
            fault_log,
            meters,
            current_fault,
            battery_voltage,
            state_flags,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsReport {
    pub datatype: u8,
    pub serial: String,
    pub latitude: f64,
    pub longitude: f64,
    pub sats: u8,
    pub fix_valid: u8,
    pub ehpe: f64,
    pub cno_min: u8,
    pub cno_max: u8,
    pub cno_avg: u8,
    pub boundary_violated: u8,
    pub boundary_action: u8,
}

impl GpsReport {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        Ok(Self {
            datatype: GPS_REPORT,
            serial: cs1108_serial(&reader.array::<4>()?),
            latitude: coordinate_degrees(reader.i32(ByteOrder::LittleEndian)?),
            longitude: coordinate_degrees(reader.i32(ByteOrder::LittleEndian)?),
            sats: reader.u8()?,
            fix_valid: reader.u8()?,
            ehpe: ehpe_metres(reader.u32(ByteOrder::LittleEndian)?),
            cno_min: reader.u8()?,
            cno_max: reader.u8()?,
            cno_avg: reader.u8()?,
            boundary_violated: reader.u8()?,
            boundary_action: reader.u8()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorPacket {
    Controller(ControllerReport),
    Gps(GpsReport),
}

// ============================================================================
// Frame
// ============================================================================

/// A received radio message with its decoded payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorMessage {
    pub from: String,
    pub msgtype: u8,
    pub length: u8,
    pub rssi: u8,
    pub lqi: u8,
    pub packet: SensorPacket,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorFrame {
    /// Short frame or unknown report type
    NoMessage,
    Message(SensorMessage),
}

impl SensorFrame {
    /// Decode a sensor data object; never fails on short input
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < MIN_FRAME_LEN {
            return Ok(Self::NoMessage);
        }

        let mut payload = BufferReader::new(&buf[..PAYLOAD_LEN]);
        let packet = match payload.u8()? {
            CONTROLLER_REPORT => SensorPacket::Controller(ControllerReport::decode(&mut payload)?),
            GPS_REPORT => SensorPacket::Gps(GpsReport::decode(&mut payload)?),
            _ => return Ok(Self::NoMessage),
        };

        let mut trailer = BufferReader::new(&buf[PAYLOAD_LEN..]);
        Ok(Self::Message(SensorMessage {
            from: short_address_to_string(trailer.u16(ByteOrder::LittleEndian)?),
            msgtype: trailer.u8()?,
            length: trailer.u8()?,
            rssi: trailer.u8()?,
            lqi: trailer.u8()?,
            packet,
        }))
    }

    /// Message type from the trailer, 0 when there is no message
    pub fn msgtype(&self) -> u8 {
        match self {
            Self::NoMessage => 0,
            Self::Message(msg) => msg.msgtype,
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Self::Message(_))
    }
}

impl Serialize for SensorFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::NoMessage => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("msgtype", &0u8)?;
                map.end()
            },
            Self::Message(msg) => msg.serialize(serializer),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde_json::json;

    fn trailer() -> [u8; 6] {
        // from 0x1234, msgtype 3, length 40, rssi 180, lqi 255
        [0x34, 0x12, 3, 40, 180, 255]
    }

    fn controller_frame() -> Vec<u8> {
        let mut buf = vec![CONTROLLER_REPORT];
        buf.extend_from_slice(&[0x20, 0x00, 0x30, 0x39]); // S0012345
        buf.extend(1..=16u8); // fault log
        buf.extend_from_slice(&[0x00, 0x80, 0x0A, 0x00]); // 10.5 hours
        buf.extend_from_slice(&[1, 2, 3, 4, 5]); // meters
        buf.push(9); // current fault
        buf.extend_from_slice(&[0x80, 0x00]); // battery
        buf.push(0x12); // bulk, in use
        buf.resize(PAYLOAD_LEN, 0);
        buf.extend_from_slice(&trailer());
        buf
    }

    fn gps_frame() -> Vec<u8> {
        let mut buf = vec![GPS_REPORT];
        buf.extend_from_slice(&[0x30, 0x00, 0x00, 0x01]); // unprogrammed serial
        buf.extend_from_slice(&451_234_567_i32.to_le_bytes());
        buf.extend_from_slice(&(-931_234_567_i32).to_le_bytes());
        buf.push(7); // sats
        buf.push(1); // fix valid
        buf.extend_from_slice(&250_u32.to_le_bytes());
        buf.extend_from_slice(&[20, 45, 33, 0, 2]);
        buf.resize(PAYLOAD_LEN, 0);
        buf.extend_from_slice(&trailer());
        buf
    }

    #[test]
    fn test_short_frame_is_no_message() {
        for len in [0, 1, 44, 45] {
            let frame = SensorFrame::decode(&vec![1u8; len]).unwrap();
            assert_eq!(frame, SensorFrame::NoMessage);
            assert_eq!(frame.msgtype(), 0);
        }
        assert_eq!(
            serde_json::to_value(SensorFrame::NoMessage).unwrap(),
            json!({"msgtype": 0})
        );
    }

    #[test]
    fn test_controller_report() {
        let frame = SensorFrame::decode(&controller_frame()).unwrap();
        let SensorFrame::Message(msg) = frame else {
            panic!("expected a message");
        };
        assert_eq!(msg.from, "1234");
        assert_eq!(msg.msgtype, 3);
        assert_eq!(msg.length, 40);
        assert_eq!(msg.rssi, 180);
        assert_eq!(msg.lqi, 255);

        let SensorPacket::Controller(report) = msg.packet else {
            panic!("expected a controller report");
        };
        assert_eq!(report.serial, "S0012345");
        assert_eq!(report.fault_log, (1..=16u8).collect::<Vec<_>>());
        assert_eq!(report.meters.hours, 10.5);
        assert_eq!(report.meters.no_float, 1);
        assert_eq!(report.meters.throt_fail, 5);
        assert_eq!(report.current_fault, 9);
        assert!((report.battery_voltage - cs1108_voltage(0x8000)).abs() < 1e-12);
        assert_eq!(report.state_flags.charging, 2);
        assert_eq!(report.state_flags.charge_mode, "Bulk");
        assert!(report.state_flags.in_use);
    }

    #[test]
    fn test_gps_report() {
        let frame = SensorFrame::decode(&gps_frame()).unwrap();
        let SensorFrame::Message(msg) = frame else {
            panic!("expected a message");
        };
        let SensorPacket::Gps(report) = msg.packet else {
            panic!("expected a GPS report");
        };
        assert_eq!(report.serial, "");
        assert!((report.latitude - 45.123_456_7).abs() < 1e-9);
        assert!((report.longitude - -93.123_456_7).abs() < 1e-9);
        assert_eq!(report.sats, 7);
        assert_eq!(report.fix_valid, 1);
        assert_eq!(report.ehpe, 2.5);
        assert_eq!(report.cno_min, 20);
        assert_eq!(report.cno_max, 45);
        assert_eq!(report.cno_avg, 33);
        assert_eq!(report.boundary_violated, 0);
        assert_eq!(report.boundary_action, 2);
    }

    #[test]
    fn test_unknown_type_is_no_message() {
        let mut buf = vec![9u8; PAYLOAD_LEN];
        buf.extend_from_slice(&trailer());
        assert_eq!(SensorFrame::decode(&buf).unwrap(), SensorFrame::NoMessage);
    }

    #[test]
    fn test_longer_frame_reads_trailer_after_payload() {
        let mut buf = controller_frame();
        buf.extend_from_slice(&[0xEE; 4]);
        let frame = SensorFrame::decode(&buf).unwrap();
        assert_eq!(frame.msgtype(), 3);
    }

    #[test]
    fn test_state_flags() {
        assert_eq!(StateFlags::from(0x08).charge_mode, "Float Charge");
        assert_eq!(StateFlags::from(0x03).charge_mode, "Not Charging");
        assert!(!StateFlags::from(0x0F).in_use);
    }
}
