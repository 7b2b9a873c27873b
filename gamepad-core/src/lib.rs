//! Platform-agnostic BLE gamepad pipeline.
//!
//! Button edges flow one way:
//!
//! ```text
//! PinIo -> PinMonitor -> BindingTable -> GamepadService -> HidLink
//!          (debounce)    (pin->button)   (aggregate,       (notify)
//!                                         connection state)
//! ```
//!
//! - [`pin`]: debounced edge detection over a [`PinIo`] layer
//! - [`mapper`]: static pin-to-button table with polarity
//! - [`aggregator`]: the single gamepad report and change tracking
//! - [`transport`]: connection state machine over a [`HidLink`]
//! - [`service`]: the application facade ([`GamepadService`])
//! - [`pipeline`]: pins to [`GamepadTransport`] ([`InputPipeline`])
//!
//! Nothing here touches hardware. Firmware supplies a [`PinIo`] and a
//! [`HidLink`]; tests supply mocks.
//!
//! # Example
//!
//! ```rust
//! use gamepad_core::{GamepadService, HidLink, LinkError, WriteError};
//! use gamepad_core::{ButtonState, LogicalButton, INPUT_REPORT_LEN};
//!
//! struct Printer;
//!
//! impl HidLink for Printer {
//!     fn start_advertising(&mut self) -> Result<(), LinkError> { Ok(()) }
//!     fn stop_advertising(&mut self) {}
//!     fn disconnect(&mut self) {}
//!     fn write_report(&mut self, r: &[u8; INPUT_REPORT_LEN]) -> Result<(), WriteError> {
//!         println!("{:02x?}", r);
//!         Ok(())
//!     }
//! }
//!
//! let mut service = GamepadService::new(Printer);
//! service.start().unwrap();
//! service.handle_connected();
//! service.set_button(LogicalButton::A, ButtonState::Pressed);
//! assert_eq!(service.current_report().encode(), [0x10]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

// Must come first so the logging macros are visible to every module.
mod fmt;

pub mod aggregator;
pub mod config;
pub mod error;
pub mod mapper;
pub mod pin;
pub mod pipeline;
pub mod service;
pub mod transport;

pub use aggregator::ReportAggregator;
pub use config::{ServiceConfig, GAMER_BIT, GAMER_BIT_BINDINGS};
pub use error::{ConfigurationError, LinkError, ProtocolViolation, ServiceError};
pub use mapper::{BindingTable, PinBinding, Polarity, MAX_BINDINGS};
pub use pin::{Debouncer, Edge, Level, PinEvent, PinId, PinIo, PinMonitor, Pull, DEFAULT_DEBOUNCE};
pub use pipeline::InputPipeline;
pub use service::{ButtonChange, GamepadService, GamepadTransport};
pub use transport::{
    Callback, ConnectionState, HidLink, HidTransport, SendOutcome, WriteError, MAX_CALLBACKS,
};

pub use gamepad_hid::{
    ButtonState, Buttons, ControlPoint, GamepadReport, LogicalButton, ProtocolMode,
    INPUT_REPORT_LEN, REPORT_ID, REPORT_MAP,
};
