//! HID-over-GATT gamepad wire types.
//!
//! This crate provides everything that has a fixed byte layout on the
//! Bluetooth link:
//!
//! - **Types**: [`LogicalButton`], [`ButtonState`] and the [`Buttons`] bitfield
//! - **Report**: [`GamepadReport`] and its one-byte encoding
//! - **Report map**: [`REPORT_MAP`] plus [`validate_report_map`] to check it
//!   against the encoder
//! - **GATT**: characteristic values for the HID and Device Information
//!   services ([`gatt`])
//! - **Advertising**: [`AdvertisingPayload`] and [`ConnectionParams`]
//!
//! # Example
//!
//! ```
//! use gamepad_hid::{ButtonState, GamepadReport, LogicalButton};
//!
//! let mut report = GamepadReport::released();
//! report.set(LogicalButton::Left, ButtonState::Pressed);
//! report.set(LogicalButton::A, ButtonState::Pressed);
//! assert_eq!(report.encode(), [0x13]);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod advertising;
pub mod descriptor;
pub mod gatt;
pub mod report;
pub mod types;

pub use advertising::{AdvertisingError, AdvertisingPayload, ConnectionParams};
pub use descriptor::{
    input_report_bits, validate_report_map, ProtocolViolation, REPORT_MAP, REPORT_MAP_BYTES,
    REPORT_MAP_LEN,
};
pub use gatt::{ControlPoint, PnpId, ProtocolMode, ReportReference};
pub use report::{GamepadReport, INPUT_REPORT_LEN, REPORT_ID};
pub use types::{ButtonState, Buttons, LogicalButton};
