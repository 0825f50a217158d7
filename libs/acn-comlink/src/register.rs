//! Register descriptors
//!
//! A [`Register`] is a long-lived value cell for one addressable region of
//! device memory. Reads store into it (`set` / `from_buffer`), writes encode
//! from it (`unformat` / `to_buffer`). The decode/encode strategy is a tagged
//! [`Codec`]: a scalar word format, a composite over child registers, or a
//! device object.

use serde_json::{json, Value};

use crate::bytes::{
    bool_array_to_u16, extract_bit_u16, extract_field, hex16_to_string, parse_number,
    string_to_hex16, u16_to_bool_array, ByteOrder,
};
use crate::error::{AcnError, Result};
use crate::objects::{FactoryConfig, ObjectKind, ObjectValue};

/// Where a register lives on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSpace {
    /// 16-bit holding registers, read and written as word blocks
    Holding,
    /// Variable-shape objects addressed by id
    Object,
}

/// Host access to a register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

// ============================================================================
// Scalar formats
// ============================================================================

/// Names reported by the `systemState` register
const SYSTEM_STATES: [&str; 6] = ["None", "Reset", "Powerup", "Idle", "Active", "Pairing"];

/// Duty cycle lookup for output configuration words
const DUTY_CYCLES: [u16; 4] = [25, 50, 75, 100];

/// Period step of output configuration words, in ms
const PERIOD_STEP: u16 = 50;

/// Host representation of a single 16-bit word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFormat {
    /// Plain unsigned number
    Decimal,
    /// `0x00FF` string
    Hex16,
    /// 16 switch states, bit 0 first
    BoolArray16,
    /// `{rssi: low byte, lqi: high byte}`
    LinkQuality,
    /// Run state name
    SystemState,
    /// `{active, duty, period}` output timing
    OutputConfig,
}

impl ScalarFormat {
    pub fn format(&self, raw: u16) -> Value {
        match self {
            Self::Decimal => json!(raw),
            Self::Hex16 => json!(hex16_to_string(raw)),
            Self::BoolArray16 => json!(u16_to_bool_array(raw).to_vec()),
            Self::LinkQuality => json!({ "rssi": raw & 0xFF, "lqi": raw >> 8 }),
            Self::SystemState => {
                json!(SYSTEM_STATES.get(usize::from(raw)).copied().unwrap_or("Unknown"))
            },
            Self::OutputConfig => {
                let duty = DUTY_CYCLES[usize::from(extract_field(raw, 0x06, 1))];
                let period = (extract_field(raw, 0xF8, 3) + 1) * PERIOD_STEP;
                json!({
                    "active": extract_bit_u16(raw, 0),
                    "duty": duty,
                    "period": period,
                })
            },
        }
    }

    pub fn unformat(&self, value: &Value) -> Result<u16> {
        match self {
            Self::Decimal => word_from(value),
            Self::Hex16 => match value {
                Value::String(s) => string_to_hex16(s),
                _ => word_from(value),
            },
            Self::BoolArray16 => match value {
                Value::Array(items) => {
                    let bits = items
                        .iter()
                        .map(|v| {
                            v.as_bool()
                                .ok_or_else(|| AcnError::encoding("Switch states must be booleans"))
                        })
                        .collect::<Result<Vec<bool>>>()?;
                    bool_array_to_u16(&bits)
                        .ok_or_else(|| AcnError::encoding("At most 16 switch states"))
                },
                _ => word_from(value),
            },
            Self::LinkQuality => {
                let rssi = byte_field(value, "rssi")?;
                let lqi = byte_field(value, "lqi")?;
                Ok(u16::from(lqi) << 8 | u16::from(rssi))
            },
            Self::SystemState => match value {
                Value::String(s) => SYSTEM_STATES
                    .iter()
                    .position(|name| name.eq_ignore_ascii_case(s))
                    .map(|i| i as u16)
                    .ok_or_else(|| AcnError::encoding(format!("Unknown system state '{}'", s))),
                _ => word_from(value),
            },
            Self::OutputConfig => {
                let active = value
                    .get("active")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| AcnError::encoding("Output config needs boolean 'active'"))?;
                let duty = u16::from(byte_field(value, "duty")?);
                let duty_index = DUTY_CYCLES
                    .iter()
                    .position(|d| *d == duty)
                    .ok_or_else(|| AcnError::encoding(format!("Unsupported duty cycle {}", duty)))?;
                let period = word_field(value, "period")?;
                if period == 0 || period % PERIOD_STEP != 0 || period / PERIOD_STEP > 32 {
                    return Err(AcnError::encoding(format!(
                        "Period {} must be a multiple of {} up to {}",
                        period,
                        PERIOD_STEP,
                        32 * PERIOD_STEP
                    )));
                }
                let steps = period / PERIOD_STEP - 1;
                Ok(u16::from(active) | (duty_index as u16) << 1 | steps << 3)
            },
        }
    }
}

/// Accept a JSON number or a decimal/`0x` string as a 16-bit word
fn word_from(value: &Value) -> Result<u16> {
    let n = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_number(s).map(u64::from),
        _ => None,
    }
    .ok_or_else(|| AcnError::encoding(format!("Expected a 16-bit number, got {}", value)))?;
    u16::try_from(n).map_err(|_| AcnError::encoding(format!("{} does not fit in 16 bits", n)))
}

fn word_field(value: &Value, key: &str) -> Result<u16> {
    let field = value
        .get(key)
        .ok_or_else(|| AcnError::encoding(format!("Missing field '{}'", key)))?;
    word_from(field)
}

fn byte_field(value: &Value, key: &str) -> Result<u8> {
    let word = word_field(value, key)?;
    u8::try_from(word).map_err(|_| AcnError::encoding(format!("'{}' must be 0..=255", key)))
}

// ============================================================================
// Codec
// ============================================================================

/// Host shape of a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeShape {
    /// Object keyed by child name
    Record,
    /// Array in address order
    List,
}

#[derive(Debug, Clone)]
pub enum Codec {
    Scalar(ScalarFormat),
    Composite {
        shape: CompositeShape,
        children: Vec<Register>,
    },
    Object {
        kind: ObjectKind,
        value: Option<ObjectValue>,
    },
}

// ============================================================================
// Register
// ============================================================================

#[derive(Debug, Clone)]
pub struct Register {
    name: &'static str,
    title: &'static str,
    address: u16,
    length: u16,
    units: Option<&'static str>,
    space: AddressSpace,
    access: Access,
    raw: u16,
    codec: Codec,
}

impl Register {
    /// Single holding register, writable unless marked otherwise
    pub fn scalar(name: &'static str, title: &'static str, address: u16, format: ScalarFormat) -> Self {
        Self {
            name,
            title,
            address,
            length: 1,
            units: None,
            space: AddressSpace::Holding,
            access: Access::ReadWrite,
            raw: 0,
            codec: Codec::Scalar(format),
        }
    }

    /// Block of contiguous holding registers spanning its children
    ///
    /// Writable only when every child is.
    pub fn composite(
        name: &'static str,
        title: &'static str,
        address: u16,
        shape: CompositeShape,
        children: Vec<Register>,
    ) -> Self {
        let access = if children.iter().all(Register::is_writable) {
            Access::ReadWrite
        } else {
            Access::ReadOnly
        };
        Self {
            name,
            title,
            address,
            length: children.iter().map(|c| c.length).sum(),
            units: None,
            space: AddressSpace::Holding,
            access,
            raw: 0,
            codec: Codec::Composite { shape, children },
        }
    }

    /// Device object; length is variable and reported as 0
    pub fn object(name: &'static str, title: &'static str, kind: ObjectKind) -> Self {
        Self {
            name,
            title,
            address: u16::from(kind.id()),
            length: 0,
            units: None,
            space: AddressSpace::Object,
            access: if kind.is_writable() {
                Access::ReadWrite
            } else {
                Access::ReadOnly
            },
            raw: 0,
            codec: Codec::Object { kind, value: None },
        }
    }

    pub fn with_units(mut self, units: &'static str) -> Self {
        self.units = Some(units);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    /// Word count for holding registers
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn units(&self) -> Option<&'static str> {
        self.units
    }

    pub fn space(&self) -> AddressSpace {
        self.space
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.codec, Codec::Composite { .. })
    }

    /// Current raw word of a scalar register
    pub fn value(&self) -> u16 {
        self.raw
    }

    /// Decoded object contents, once read
    pub fn object_value(&self) -> Option<&ObjectValue> {
        match &self.codec {
            Codec::Object { value, .. } => value.as_ref(),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Register] {
        match &self.codec {
            Codec::Composite { children, .. } => children,
            _ => &[],
        }
    }

    /// Find this register or a descendant by name
    pub fn find(&self, name: &str) -> Option<&Register> {
        if self.name == name {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Register> {
        if self.name == name {
            return Some(self);
        }
        match &mut self.codec {
            Codec::Composite { children, .. } => children.iter_mut().find_map(|c| c.find_mut(name)),
            _ => None,
        }
    }

    /// Store a raw word read from the device
    pub fn set(&mut self, raw: u16) {
        self.raw = raw;
    }

    /// Host-facing representation
    pub fn format(&self) -> Value {
        match &self.codec {
            Codec::Scalar(format) => format.format(self.raw),
            Codec::Composite { shape, children } => match shape {
                CompositeShape::Record => Value::Object(
                    children
                        .iter()
                        .map(|c| (c.name.to_string(), c.format()))
                        .collect(),
                ),
                CompositeShape::List => Value::Array(children.iter().map(Register::format).collect()),
            },
            Codec::Object { value, .. } => value.as_ref().map_or(Value::Null, ObjectValue::to_json),
        }
    }

    /// Store a host value, validating it can be encoded
    ///
    /// Composite values are applied only if every field is valid.
    pub fn unformat(&mut self, value: &Value) -> Result<()> {
        let name = self.name;
        match &mut self.codec {
            Codec::Scalar(format) => {
                self.raw = format
                    .unformat(value)
                    .map_err(|e| AcnError::encoding(format!("{}: {}", name, e)))?;
            },
            Codec::Composite { shape, children } => {
                let raws = match shape {
                    CompositeShape::Record => {
                        let fields = value.as_object().ok_or_else(|| {
                            AcnError::encoding(format!("{} expects an object", name))
                        })?;
                        children
                            .iter()
                            .map(|c| {
                                let field = fields.get(c.name).ok_or_else(|| {
                                    AcnError::encoding(format!("{}: missing field '{}'", name, c.name))
                                })?;
                                c.encode_scalar(field)
                            })
                            .collect::<Result<Vec<u16>>>()?
                    },
                    CompositeShape::List => {
                        let items = value.as_array().ok_or_else(|| {
                            AcnError::encoding(format!("{} expects an array", name))
                        })?;
                        if items.len() != children.len() {
                            return Err(AcnError::encoding(format!(
                                "{} expects {} entries, got {}",
                                name,
                                children.len(),
                                items.len()
                            )));
                        }
                        children
                            .iter()
                            .zip(items)
                            .map(|(c, item)| c.encode_scalar(item))
                            .collect::<Result<Vec<u16>>>()?
                    },
                };
                for (child, raw) in children.iter_mut().zip(raws) {
                    child.set(raw);
                }
            },
            Codec::Object { kind, value: slot } => match kind {
                ObjectKind::FactoryConfig => {
                    *slot = Some(ObjectValue::Factory(Some(FactoryConfig::from_json(value)?)));
                },
                _ => return Err(AcnError::ReadOnly(name.to_string())),
            },
        }
        Ok(())
    }

    fn encode_scalar(&self, value: &Value) -> Result<u16> {
        match &self.codec {
            Codec::Scalar(format) => format
                .unformat(value)
                .map_err(|e| AcnError::encoding(format!("{}: {}", self.name, e))),
            _ => Err(AcnError::encoding(format!("{} is not a single word", self.name))),
        }
    }

    /// Populate from a device response
    ///
    /// Holding registers require exactly `length` big-endian words.
    pub fn from_buffer(&mut self, buf: &[u8]) -> Result<()> {
        let expected = usize::from(self.length) * 2;
        let base = self.address;
        match &mut self.codec {
            Codec::Object { kind, value } => {
                *value = Some(kind.decode(buf)?);
                return Ok(());
            },
            _ if buf.len() != expected => {
                return Err(AcnError::data_integrity(format!(
                    "{}: expected {} bytes, got {}",
                    self.name,
                    expected,
                    buf.len()
                )));
            },
            Codec::Scalar(_) => {
                self.raw = ByteOrder::BigEndian.u16_from([buf[0], buf[1]]);
            },
            Codec::Composite { children, .. } => {
                for child in children.iter_mut() {
                    let start = usize::from(child.address - base) * 2;
                    let end = start + usize::from(child.length) * 2;
                    child.from_buffer(&buf[start..end])?;
                }
            },
        }
        Ok(())
    }

    /// Encode for transmission
    ///
    /// Holding registers produce exactly `length` big-endian words.
    pub fn to_buffer(&self) -> Result<Vec<u8>> {
        match &self.codec {
            Codec::Scalar(_) => Ok(ByteOrder::BigEndian.u16_to(self.raw).to_vec()),
            Codec::Composite { children, .. } => {
                let mut out = vec![0u8; usize::from(self.length) * 2];
                for child in children {
                    let start = usize::from(child.address - self.address) * 2;
                    let bytes = child.to_buffer()?;
                    out[start..start + bytes.len()].copy_from_slice(&bytes);
                }
                Ok(out)
            },
            Codec::Object { kind, value } => match (kind, value) {
                (ObjectKind::FactoryConfig, Some(ObjectValue::Factory(Some(config)))) => {
                    config.encode()
                },
                (ObjectKind::FactoryConfig, _) => {
                    Err(AcnError::encoding("Factory config has no value to write"))
                },
                _ => Err(AcnError::ReadOnly(self.name.to_string())),
            },
        }
    }
}
