//! Core types for RadonEye sensor data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};
use crate::uuid::{
    RD200_COMMAND, RD200_RESPONSE, RD200_SERVICE, RD200_V2_COMMAND, RD200_V2_RESPONSE,
    RD200_V2_SERVICE,
};

/// Conversion factor between the two radon units: 1 pCi/L = 37 Bq/m³.
pub const BQ_PER_PCI: f64 = 37.0;

/// Opcode requesting the current radon value from original RD200 firmware.
pub const RD200_READ_COMMAND: u8 = 0x50;

/// Opcode requesting the current radon value from current RD200 firmware.
pub const RD200_V2_READ_COMMAND: u8 = 0x40;

/// Minimum response length for original RD200 firmware.
pub const MIN_RD200_RESPONSE_BYTES: usize = 6;

/// Minimum response length for current RD200 firmware.
pub const MIN_RD200_V2_RESPONSE_BYTES: usize = 35;

/// Byte offset of the radon value inside a current-firmware response.
const RD200_V2_RADON_OFFSET: usize = 33;

/// Decode protocol used to talk to a device.
///
/// The numeric selector is what operators put in configuration files and
/// on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "u8", into = "u8")
)]
#[non_exhaustive]
#[repr(u8)]
pub enum DeviceType {
    /// RD200 running original firmware (float pCi/L response).
    Rd200 = 0,
    /// RD200 running current firmware (integer Bq/m³ response).
    #[default]
    Rd200V2 = 1,
}

impl DeviceType {
    /// Opcode written to the command characteristic to request a reading.
    #[must_use]
    pub fn read_command(self) -> u8 {
        match self {
            DeviceType::Rd200 => RD200_READ_COMMAND,
            DeviceType::Rd200V2 => RD200_V2_READ_COMMAND,
        }
    }

    /// Vendor service UUID for this protocol.
    #[must_use]
    pub fn service_uuid(self) -> uuid::Uuid {
        match self {
            DeviceType::Rd200 => RD200_SERVICE,
            DeviceType::Rd200V2 => RD200_V2_SERVICE,
        }
    }

    /// Command characteristic UUID for this protocol.
    #[must_use]
    pub fn command_uuid(self) -> uuid::Uuid {
        match self {
            DeviceType::Rd200 => RD200_COMMAND,
            DeviceType::Rd200V2 => RD200_V2_COMMAND,
        }
    }

    /// Response characteristic UUID for this protocol.
    #[must_use]
    pub fn response_uuid(self) -> uuid::Uuid {
        match self {
            DeviceType::Rd200 => RD200_RESPONSE,
            DeviceType::Rd200V2 => RD200_V2_RESPONSE,
        }
    }
}

impl TryFrom<u8> for DeviceType {
    type Error = ParseError;

    /// Convert a protocol selector to a `DeviceType`.
    ///
    /// # Examples
    ///
    /// ```
    /// use radoneye_types::DeviceType;
    ///
    /// assert_eq!(DeviceType::try_from(0), Ok(DeviceType::Rd200));
    /// assert_eq!(DeviceType::try_from(1), Ok(DeviceType::Rd200V2));
    /// assert!(DeviceType::try_from(7).is_err());
    /// ```
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceType::Rd200),
            1 => Ok(DeviceType::Rd200V2),
            _ => Err(ParseError::UnknownDeviceType(value)),
        }
    }
}

impl From<DeviceType> for u8 {
    fn from(value: DeviceType) -> Self {
        value as u8
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Rd200 => write!(f, "RD200"),
            DeviceType::Rd200V2 => write!(f, "RD200 (v2)"),
        }
    }
}

/// Radon concentration unit, chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unit {
    /// Becquerel per cubic metre.
    #[cfg_attr(feature = "serde", serde(rename = "bq", alias = "becquerel"))]
    Becquerel,
    /// Picocurie per litre.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "pci", alias = "picocurie"))]
    PicoCurie,
}

impl Unit {
    /// Unit symbol as printed next to a value.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Becquerel => "Bq/m³",
            Unit::PicoCurie => "pCi/L",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bq" | "becquerel" | "bq/m3" | "bq/m³" => Ok(Unit::Becquerel),
            "pci" | "picocurie" | "pci/l" => Ok(Unit::PicoCurie),
            other => Err(ParseError::UnknownUnit(other.to_string())),
        }
    }
}

/// One acquisition from a device, expressed in both units.
///
/// Devices report in a single native unit; the other value is derived with
/// [`BQ_PER_PCI`]. Values are kept exactly as decoded so range checks see
/// the raw measurement; use [`DualReading::rounded`] for the stored value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DualReading {
    /// Radon concentration in Bq/m³.
    pub becquerel: f64,
    /// Radon concentration in pCi/L.
    pub picocurie: f64,
}

impl DualReading {
    /// Build a reading from a Bq/m³ value.
    #[must_use]
    pub fn from_becquerel(becquerel: f64) -> Self {
        Self {
            becquerel,
            picocurie: becquerel / BQ_PER_PCI,
        }
    }

    /// Build a reading from a pCi/L value.
    #[must_use]
    pub fn from_picocurie(picocurie: f64) -> Self {
        Self {
            becquerel: picocurie * BQ_PER_PCI,
            picocurie,
        }
    }

    /// The value in the requested unit.
    #[must_use]
    pub fn value(&self, unit: Unit) -> f64 {
        match unit {
            Unit::Becquerel => self.becquerel,
            Unit::PicoCurie => self.picocurie,
        }
    }

    /// The value in the requested unit, rounded to hundredths.
    #[must_use]
    pub fn rounded(&self, unit: Unit) -> f64 {
        round2(self.value(unit))
    }

    /// Decode a response for the given protocol.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the response is too short or does not echo
    /// the protocol's read command.
    pub fn from_bytes(device_type: DeviceType, data: &[u8]) -> ParseResult<Self> {
        match device_type {
            DeviceType::Rd200 => Self::from_bytes_rd200(data),
            DeviceType::Rd200V2 => Self::from_bytes_rd200_v2(data),
        }
    }

    /// Decode an original-firmware response.
    ///
    /// Layout:
    /// - byte 0: echoed opcode (`0x50`)
    /// - byte 1: payload length
    /// - bytes 2-5: current radon (f32 LE, pCi/L)
    pub fn from_bytes_rd200(data: &[u8]) -> ParseResult<Self> {
        use bytes::Buf;

        check_header(data, MIN_RD200_RESPONSE_BYTES, RD200_READ_COMMAND)?;

        let mut buf = &data[2..];
        let picocurie = f64::from(buf.get_f32_le());
        Ok(Self::from_picocurie(picocurie))
    }

    /// Decode a current-firmware response.
    ///
    /// Layout:
    /// - byte 0: echoed opcode (`0x40`)
    /// - bytes 33-34: current radon (u16 LE, Bq/m³)
    pub fn from_bytes_rd200_v2(data: &[u8]) -> ParseResult<Self> {
        use bytes::Buf;

        check_header(data, MIN_RD200_V2_RESPONSE_BYTES, RD200_V2_READ_COMMAND)?;

        let mut buf = &data[RD200_V2_RADON_OFFSET..];
        let becquerel = f64::from(buf.get_u16_le());
        Ok(Self::from_becquerel(becquerel))
    }
}

fn check_header(data: &[u8], min_len: usize, opcode: u8) -> ParseResult<()> {
    if data.len() < min_len {
        return Err(ParseError::InsufficientBytes {
            expected: min_len,
            actual: data.len(),
        });
    }
    if data[0] != opcode {
        return Err(ParseError::UnexpectedHeader {
            expected: opcode,
            actual: data[0],
        });
    }
    Ok(())
}

/// Round to two decimal places, half away from zero.
///
/// Negative zero is normalized to `0.0`.
///
/// ```
/// use radoneye_types::round2;
///
/// assert_eq!(round2(1.005_1), 1.01);
/// assert_eq!(round2(15.0), 15.0);
/// assert!(round2(-0.001).is_sign_positive());
/// ```
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rd200_response(pci: f32) -> Vec<u8> {
        let mut data = vec![RD200_READ_COMMAND, 0x0A];
        data.extend_from_slice(&pci.to_le_bytes());
        data.extend_from_slice(&[0; 6]);
        data
    }

    fn rd200_v2_response(bq: u16) -> Vec<u8> {
        let mut data = vec![0u8; MIN_RD200_V2_RESPONSE_BYTES + 4];
        data[0] = RD200_V2_READ_COMMAND;
        data[RD200_V2_RADON_OFFSET..RD200_V2_RADON_OFFSET + 2].copy_from_slice(&bq.to_le_bytes());
        data
    }

    #[test]
    fn test_device_type_selector_round_trip() {
        for device_type in [DeviceType::Rd200, DeviceType::Rd200V2] {
            let raw: u8 = device_type.into();
            assert_eq!(DeviceType::try_from(raw), Ok(device_type));
        }
        assert_eq!(
            DeviceType::try_from(2),
            Err(ParseError::UnknownDeviceType(2))
        );
    }

    #[test]
    fn test_device_type_default_is_current_firmware() {
        assert_eq!(DeviceType::default(), DeviceType::Rd200V2);
    }

    #[test]
    fn test_device_type_commands() {
        assert_eq!(DeviceType::Rd200.read_command(), 0x50);
        assert_eq!(DeviceType::Rd200V2.read_command(), 0x40);
        assert_eq!(DeviceType::Rd200.command_uuid(), RD200_COMMAND);
        assert_eq!(DeviceType::Rd200V2.response_uuid(), RD200_V2_RESPONSE);
    }

    #[test]
    fn test_unit_from_str() {
        assert_eq!("bq".parse::<Unit>(), Ok(Unit::Becquerel));
        assert_eq!("Bq/m3".parse::<Unit>(), Ok(Unit::Becquerel));
        assert_eq!("PCI".parse::<Unit>(), Ok(Unit::PicoCurie));
        assert!(matches!(
            "sievert".parse::<Unit>(),
            Err(ParseError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_unit_default_is_picocurie() {
        assert_eq!(Unit::default(), Unit::PicoCurie);
        assert_eq!(Unit::Becquerel.to_string(), "Bq/m³");
    }

    #[test]
    fn test_dual_reading_conversions() {
        let reading = DualReading::from_picocurie(2.0);
        assert_eq!(reading.becquerel, 74.0);
        assert_eq!(reading.value(Unit::PicoCurie), 2.0);
        assert_eq!(reading.value(Unit::Becquerel), 74.0);

        let reading = DualReading::from_becquerel(100.0);
        assert_eq!(reading.picocurie, 100.0 / 37.0);
        assert_eq!(reading.rounded(Unit::PicoCurie), 2.7);
        assert_eq!(reading.rounded(Unit::Becquerel), 100.0);
    }

    #[test]
    fn test_dual_reading_keeps_raw_values() {
        let reading = DualReading::from_picocurie(-0.0001);
        assert!(reading.becquerel < 0.0);

        let reading = DualReading::from_becquerel(1000.004);
        assert_eq!(reading.becquerel, 1000.004);
        assert_eq!(reading.rounded(Unit::Becquerel), 1000.0);
    }

    #[test]
    fn test_decode_rd200() {
        let reading = DualReading::from_bytes(DeviceType::Rd200, &rd200_response(1.5)).unwrap();
        assert_eq!(reading.picocurie, 1.5);
        assert_eq!(reading.becquerel, 55.5);
    }

    #[test]
    fn test_decode_rd200_v2() {
        let reading =
            DualReading::from_bytes(DeviceType::Rd200V2, &rd200_v2_response(148)).unwrap();
        assert_eq!(reading.becquerel, 148.0);
        assert_eq!(reading.picocurie, 4.0);
    }

    #[test]
    fn test_decode_short_response() {
        let err = DualReading::from_bytes_rd200(&[RD200_READ_COMMAND, 0x0A, 0x00]).unwrap_err();
        assert_eq!(
            err,
            ParseError::InsufficientBytes {
                expected: MIN_RD200_RESPONSE_BYTES,
                actual: 3
            }
        );
    }

    #[test]
    fn test_decode_wrong_header() {
        let mut data = rd200_v2_response(10);
        data[0] = 0x51;
        let err = DualReading::from_bytes_rd200_v2(&data).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedHeader {
                expected: RD200_V2_READ_COMMAND,
                actual: 0x51
            }
        );
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(-0.004), 0.0);
        assert!(round2(-0.004).is_sign_positive());
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(-1.005_1), -1.01);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_representations() {
        assert_eq!(serde_json::to_string(&Unit::Becquerel).unwrap(), "\"bq\"");
        assert_eq!(
            serde_json::from_str::<Unit>("\"picocurie\"").unwrap(),
            Unit::PicoCurie
        );
        assert_eq!(serde_json::to_string(&DeviceType::Rd200).unwrap(), "0");
        assert_eq!(
            serde_json::from_str::<DeviceType>("1").unwrap(),
            DeviceType::Rd200V2
        );
        assert!(serde_json::from_str::<DeviceType>("9").is_err());
    }
}
