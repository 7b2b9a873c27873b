//! Service configuration.

use crate::mapper::{PinBinding, Polarity};
use crate::pin::{Pull, DEFAULT_DEBOUNCE};
use embassy_time::Duration;
use gamepad_hid::LogicalButton;

/// Pin wiring of the SparkFun gamer:bit board.
pub const GAMER_BIT_BINDINGS: [PinBinding; 8] = [
    PinBinding::new(0, LogicalButton::Up),
    PinBinding::new(1, LogicalButton::Left),
    PinBinding::new(2, LogicalButton::Right),
    PinBinding::new(8, LogicalButton::Down),
    PinBinding::new(16, LogicalButton::A),
    PinBinding::new(12, LogicalButton::B),
    PinBinding::new(5, LogicalButton::Select),
    PinBinding::new(11, LogicalButton::Start),
];

/// Gamer:bit buttons: active-low with internal pull-ups.
pub const GAMER_BIT: ServiceConfig = ServiceConfig::new(&GAMER_BIT_BINDINGS);

/// Wiring and input conditioning for the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceConfig {
    pub bindings: &'static [PinBinding],
    pub polarity: Polarity,
    pub pull: Pull,
    pub debounce: Duration,
}

impl ServiceConfig {
    /// Active-low bindings with pull-ups and the default debounce window.
    #[must_use]
    pub const fn new(bindings: &'static [PinBinding]) -> Self {
        Self {
            bindings,
            polarity: Polarity::ActiveLow,
            pull: Pull::Up,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Buttons that drive the line high, idling on a pull-down.
    #[must_use]
    pub const fn active_high(mut self) -> Self {
        self.polarity = Polarity::ActiveHigh;
        self.pull = Pull::Down;
        self
    }

    #[must_use]
    pub const fn with_pull(mut self, pull: Pull) -> Self {
        self.pull = pull;
        self
    }

    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        GAMER_BIT
    }
}
