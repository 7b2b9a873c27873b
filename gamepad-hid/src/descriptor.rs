//! HID report map advertised through the Report Map characteristic.

use crate::report::{INPUT_REPORT_LEN, REPORT_ID};

/// Gamepad report map.
///
/// Defines report 1 with:
/// - X/Y axes (logical -1..1, 2 bits each) fed by the d-pad
/// - 4 buttons (A, B, Select, Start; 1 bit each)
pub const REPORT_MAP: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    0xA1, 0x00, //   Collection (Physical)
    0x85, REPORT_ID, // Report ID (1)
    //
    // --- Axes ---
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0xFF, //     Logical Minimum (-1)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x02, //     Report Size (2)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // --- Buttons ---
    0x05, 0x09, //     Usage Page (Button)
    0x09, 0x01, //     Usage (Button 1) - A
    0x09, 0x02, //     Usage (Button 2) - B
    0x09, 0x0B, //     Usage (Button 11) - Select
    0x09, 0x0C, //     Usage (Button 12) - Start
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x04, //     Report Count (4)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    0xC0, //   End Collection
    0xC0, // End Collection
];

// A report map that disagrees with the encoder is a build error.
const _: () = assert!(
    input_report_bits(REPORT_MAP, REPORT_ID) == (INPUT_REPORT_LEN as u32) * 8,
    "REPORT_MAP does not describe INPUT_REPORT_LEN bytes"
);

pub const REPORT_MAP_LEN: usize = REPORT_MAP.len();

/// [`REPORT_MAP`] by value, for GATT tables that store fixed-size arrays.
pub const REPORT_MAP_BYTES: [u8; REPORT_MAP_LEN] = {
    let mut out = [0u8; REPORT_MAP_LEN];
    let mut i = 0;
    while i < REPORT_MAP_LEN {
        out[i] = REPORT_MAP[i];
        i += 1;
    }
    out
};

const TAG_MASK: u8 = 0xFC;
const SIZE_MASK: u8 = 0x03;
const LONG_ITEM: u8 = 0xFE;

const TAG_INPUT: u8 = 0x80;
const TAG_REPORT_SIZE: u8 = 0x74;
const TAG_REPORT_ID: u8 = 0x84;
const TAG_REPORT_COUNT: u8 = 0x94;
const TAG_PUSH: u8 = 0xA4;
const TAG_POP: u8 = 0xB4;

/// Report map disagrees with the report the firmware encodes.
///
/// This is a programming error, detected at build time for the built-in map
/// and again when the service starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProtocolViolation {
    /// Input bits the report map describes.
    pub descriptor_bits: u32,
    /// Bits the encoder produces.
    pub report_bits: u32,
}

impl core::fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "report map describes {} input bits, encoder produces {}",
            self.descriptor_bits, self.report_bits
        )
    }
}

/// Sum the Input item bits a report map declares for `report_id`.
///
/// Walks short items tracking Report Size, Report Count and Report ID
/// (including Push/Pop of the global state one level deep) and skips long
/// items. Maps without a Report ID item count every Input item.
#[must_use]
pub const fn input_report_bits(map: &[u8], report_id: u8) -> u32 {
    let mut i = 0;
    let mut bits = 0u32;
    let mut size = 0u32;
    let mut count = 0u32;
    let mut id = 0u8;
    let mut saved = (0u32, 0u32, 0u8);

    while i < map.len() {
        let prefix = map[i];
        if prefix == LONG_ITEM {
            if i + 1 >= map.len() {
                break;
            }
            i += 3 + map[i + 1] as usize;
            continue;
        }

        let len = match prefix & SIZE_MASK {
            3 => 4,
            n => n as usize,
        };
        if i + len >= map.len() {
            break;
        }
        let value = item_value(map, i + 1, len);

        match prefix & TAG_MASK {
            TAG_REPORT_SIZE => size = value,
            TAG_REPORT_COUNT => count = value,
            TAG_REPORT_ID => id = value as u8,
            TAG_PUSH => saved = (size, count, id),
            TAG_POP => {
                size = saved.0;
                count = saved.1;
                id = saved.2;
            }
            TAG_INPUT => {
                if id == 0 || id == report_id {
                    bits = bits.saturating_add(size.saturating_mul(count));
                }
            }
            _ => {}
        }

        i += 1 + len;
    }

    bits
}

const fn item_value(map: &[u8], start: usize, len: usize) -> u32 {
    let mut value = 0u32;
    let mut n = 0;
    while n < len {
        value |= (map[start + n] as u32) << (8 * n);
        n += 1;
    }
    value
}

/// Check that `map` describes exactly `report_len` bytes of input for
/// [`REPORT_ID`].
///
/// # Errors
///
/// Returns [`ProtocolViolation`] when the sizes disagree.
pub fn validate_report_map(map: &[u8], report_len: usize) -> Result<(), ProtocolViolation> {
    let descriptor_bits = input_report_bits(map, REPORT_ID);
    let report_bits = (report_len as u32).saturating_mul(8);
    if descriptor_bits == report_bits {
        Ok(())
    } else {
        Err(ProtocolViolation {
            descriptor_bits,
            report_bits,
        })
    }
}
