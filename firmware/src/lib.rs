//! Bluetooth LE HID gamepad for the BBC micro:bit v2.
//!
//! This crate provides the nRF52833 side of the gamepad: edge-connector
//! inputs behind [`PinIo`](gamepad_core::PinIo) and a SoftDevice GATT server
//! behind [`HidLink`](gamepad_core::HidLink).

#![no_std]

// Re-export core types for convenience
pub use gamepad_core::{
    ButtonChange, ButtonState, ConfigurationError, ConnectionState, GamepadService,
    GamepadTransport, InputPipeline, Level, LinkError, LogicalButton, PinId, ServiceConfig,
    GAMER_BIT,
};

pub mod ble;
pub mod board;

pub use ble::{Bonder, HostWrite, Server, SoftdeviceLink};
pub use board::Board;
