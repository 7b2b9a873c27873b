//! Button State Mapper: (pin, edge) to (logical button, state).

use crate::error::ConfigurationError;
use crate::pin::{Edge, Level, PinId};
use gamepad_hid::{ButtonState, LogicalButton};
use heapless::Vec;

/// Maximum number of pin bindings.
pub const MAX_BINDINGS: usize = 16;

/// Electrical sense of a button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Button pulls the line to ground when pressed (pull-up wiring).
    #[default]
    ActiveLow,
    /// Button drives the line high when pressed.
    ActiveHigh,
}

impl Polarity {
    /// State implied by the level an edge ends at.
    #[inline]
    #[must_use]
    pub const fn state_for(self, edge: Edge) -> ButtonState {
        match (self, edge) {
            (Polarity::ActiveLow, Edge::Fall) | (Polarity::ActiveHigh, Edge::Rise) => {
                ButtonState::Pressed
            }
            _ => ButtonState::Released,
        }
    }

    /// State implied by a steady level.
    #[inline]
    #[must_use]
    pub const fn state_for_level(self, level: Level) -> ButtonState {
        self.state_for(Edge::into_level(level))
    }
}

/// Static mapping of one physical pin to a logical button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinBinding {
    pub pin: PinId,
    pub button: LogicalButton,
}

impl PinBinding {
    #[must_use]
    pub const fn new(pin: u8, button: LogicalButton) -> Self {
        Self {
            pin: PinId(pin),
            button,
        }
    }
}

/// Immutable pin-to-button table.
///
/// Each pin maps to at most one button; several pins may share a button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingTable {
    bindings: Vec<PinBinding, MAX_BINDINGS>,
    polarity: Polarity,
}

impl BindingTable {
    /// Build the table.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::DuplicatePin`] if a pin is listed twice,
    /// [`ConfigurationError::TooManyBindings`] past [`MAX_BINDINGS`].
    pub fn new(bindings: &[PinBinding], polarity: Polarity) -> Result<Self, ConfigurationError> {
        let mut table = Vec::new();
        for binding in bindings {
            if table.iter().any(|b: &PinBinding| b.pin == binding.pin) {
                return Err(ConfigurationError::DuplicatePin(binding.pin));
            }
            table
                .push(*binding)
                .map_err(|_| ConfigurationError::TooManyBindings)?;
        }

        Ok(Self {
            bindings: table,
            polarity,
        })
    }

    #[inline]
    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Map an edge to a button change. Unbound pins yield `None`.
    #[must_use]
    pub fn map(&self, pin: PinId, edge: Edge) -> Option<(LogicalButton, ButtonState)> {
        self.button(pin)
            .map(|button| (button, self.polarity.state_for(edge)))
    }

    /// Button bound to `pin`.
    #[must_use]
    pub fn button(&self, pin: PinId) -> Option<LogicalButton> {
        self.bindings
            .iter()
            .find(|b| b.pin == pin)
            .map(|b| b.button)
    }

    /// Bound pins, in table order.
    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.bindings.iter().map(|b| b.pin)
    }

    #[must_use]
    pub fn bindings(&self) -> &[PinBinding] {
        &self.bindings
    }
}
