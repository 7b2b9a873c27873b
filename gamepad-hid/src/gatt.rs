//! HID-over-GATT service constants and characteristic values.
//!
//! Values for the HID service (0x1812) and the Device Information service
//! (0x180A) the gamepad exposes. The BLE stack adapter registers these;
//! nothing here talks to a radio.

use crate::report::REPORT_ID;

/// 16-bit UUIDs assigned by the Bluetooth SIG.
pub mod uuid {
    pub const HUMAN_INTERFACE_DEVICE: u16 = 0x1812;
    pub const DEVICE_INFORMATION: u16 = 0x180A;

    pub const REPORT: u16 = 0x2A4D;
    pub const REPORT_MAP: u16 = 0x2A4B;
    pub const HID_INFORMATION: u16 = 0x2A4A;
    pub const HID_CONTROL_POINT: u16 = 0x2A4C;
    pub const PROTOCOL_MODE: u16 = 0x2A4E;
    pub const PNP_ID: u16 = 0x2A50;
    pub const MANUFACTURER_NAME: u16 = 0x2A29;
    pub const MODEL_NUMBER: u16 = 0x2A24;
    pub const BATTERY_LEVEL: u16 = 0x2A19;

    pub const CLIENT_CHARACTERISTIC_CONFIGURATION: u16 = 0x2902;
    pub const EXTERNAL_REPORT_REFERENCE: u16 = 0x2907;
    pub const REPORT_REFERENCE: u16 = 0x2908;
}

/// HID Information value: bcdHID 1.11, country code 0,
/// flags RemoteWake | NormallyConnectable.
pub const HID_INFORMATION: [u8; 4] = [0x11, 0x01, 0x00, 0x03];

/// Report Reference descriptor value of the gamepad input report.
pub const INPUT_REPORT_REFERENCE: [u8; 2] = ReportReference::input(REPORT_ID).to_bytes();

/// External Report Reference of the report map (Battery Level).
pub const REPORT_MAP_EXTERNAL_REFERENCE: [u8; 2] = uuid::BATTERY_LEVEL.to_le_bytes();

/// Identity reported in the PnP ID characteristic.
pub const MICROBIT_PNP_ID: PnpId = PnpId {
    vendor_id_source: VendorIdSource::UsbImplementersForum,
    vendor_id: 0x0D28,
    product_id: 0x0204,
    product_version: 0x0100,
};

pub const MANUFACTURER_NAME: &str = "BBC";
pub const MODEL_NUMBER: &str = "uBit";

/// Value of a byte written to a characteristic is not a known code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue(pub u8);

/// Protocol Mode characteristic value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProtocolMode {
    Boot = 0x00,
    #[default]
    Report = 0x01,
}

impl TryFrom<u8> for ProtocolMode {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ProtocolMode::Boot),
            0x01 => Ok(ProtocolMode::Report),
            other => Err(InvalidValue(other)),
        }
    }
}

/// HID Control Point command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlPoint {
    Suspend = 0x00,
    ExitSuspend = 0x01,
}

impl TryFrom<u8> for ControlPoint {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ControlPoint::Suspend),
            0x01 => Ok(ControlPoint::ExitSuspend),
            other => Err(InvalidValue(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReportType {
    Input = 0x01,
    Output = 0x02,
    Feature = 0x03,
}

/// Report Reference descriptor (0x2908): report ID and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportReference {
    pub id: u8,
    pub kind: ReportType,
}

impl ReportReference {
    #[must_use]
    pub const fn input(id: u8) -> Self {
        Self {
            id,
            kind: ReportType::Input,
        }
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 2] {
        [self.id, self.kind as u8]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum VendorIdSource {
    BluetoothSig = 0x01,
    UsbImplementersForum = 0x02,
}

/// PnP ID characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PnpId {
    pub vendor_id_source: VendorIdSource,
    pub vendor_id: u16,
    pub product_id: u16,
    pub product_version: u16,
}

impl PnpId {
    pub const SIZE: usize = 7;

    /// Little-endian wire encoding.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        let vid = self.vendor_id.to_le_bytes();
        let pid = self.product_id.to_le_bytes();
        let ver = self.product_version.to_le_bytes();
        [
            self.vendor_id_source as u8,
            vid[0],
            vid[1],
            pid[0],
            pid[1],
            ver[0],
            ver[1],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_report_reference() {
        assert_eq!(INPUT_REPORT_REFERENCE, [0x01, 0x01]);
    }

    #[test]
    fn test_external_reference_is_little_endian() {
        assert_eq!(REPORT_MAP_EXTERNAL_REFERENCE, [0x19, 0x2A]);
    }

    #[test]
    fn test_microbit_pnp_id() {
        assert_eq!(
            MICROBIT_PNP_ID.to_bytes(),
            [0x02, 0x28, 0x0D, 0x04, 0x02, 0x00, 0x01]
        );
    }

    #[test]
    fn test_protocol_mode_decoding() {
        assert_eq!(ProtocolMode::try_from(0), Ok(ProtocolMode::Boot));
        assert_eq!(ProtocolMode::try_from(1), Ok(ProtocolMode::Report));
        assert_eq!(ProtocolMode::try_from(7), Err(InvalidValue(7)));
        assert_eq!(ProtocolMode::default(), ProtocolMode::Report);
    }

    #[test]
    fn test_control_point_decoding() {
        assert_eq!(ControlPoint::try_from(0), Ok(ControlPoint::Suspend));
        assert_eq!(ControlPoint::try_from(1), Ok(ControlPoint::ExitSuspend));
        assert_eq!(ControlPoint::try_from(2), Err(InvalidValue(2)));
    }
}
