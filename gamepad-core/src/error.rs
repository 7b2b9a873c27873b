//! Error types.

use crate::pin::PinId;
pub use gamepad_hid::ProtocolViolation;

/// Invalid setup. Fatal: the service does not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationError {
    /// Pin is reserved by another peripheral or does not exist.
    PinUnavailable(PinId),
    /// Pin appears in more than one binding.
    DuplicatePin(PinId),
    /// More bindings than the table holds.
    TooManyBindings,
    /// Observer list for a connection event is full.
    TooManyCallbacks,
}

impl core::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigurationError::PinUnavailable(pin) => write!(f, "pin {} is unavailable", pin),
            ConfigurationError::DuplicatePin(pin) => write!(f, "pin {} is bound twice", pin),
            ConfigurationError::TooManyBindings => f.write_str("too many pin bindings"),
            ConfigurationError::TooManyCallbacks => f.write_str("too many connection callbacks"),
        }
    }
}

/// Radio or BLE stack failure.
///
/// Never surfaced to the application as an error: the transport drops to
/// [`Disconnected`](crate::ConnectionState::Disconnected) and fires the
/// disconnect callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The stack refused to start advertising.
    Advertising,
    /// The link went away under a write.
    Disconnected,
    /// Any other radio or GATT failure.
    Radio,
    /// Supervision timeout.
    Timeout,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            LinkError::Advertising => "advertising failed",
            LinkError::Disconnected => "link disconnected",
            LinkError::Radio => "radio failure",
            LinkError::Timeout => "supervision timeout",
        })
    }
}

/// Error type for service start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceError {
    Configuration(ConfigurationError),
    Protocol(ProtocolViolation),
}

impl From<ConfigurationError> for ServiceError {
    fn from(e: ConfigurationError) -> Self {
        ServiceError::Configuration(e)
    }
}

impl From<ProtocolViolation> for ServiceError {
    fn from(e: ProtocolViolation) -> Self {
        ServiceError::Protocol(e)
    }
}

impl core::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ServiceError::Configuration(e) => write!(f, "configuration error: {}", e),
            ServiceError::Protocol(e) => write!(f, "protocol violation: {}", e),
        }
    }
}
