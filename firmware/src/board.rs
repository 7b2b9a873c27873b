//! micro:bit v2 edge connector as a [`PinIo`].

use defmt::{debug, warn};
use embassy_nrf::gpio::{AnyPin, Input, Pull as NrfPull};
use embassy_nrf::{Peri, Peripherals};
use gamepad_core::pin::MAX_PINS;
use gamepad_core::{ConfigurationError, Level, PinId, PinIo, Pull};
use heapless::Vec;

/// Edge-connector pins P0..=P20.
pub const EDGE_PINS: usize = 21;

/// Edge-connector GPIOs available as button inputs.
///
/// Slots left empty are wired to the LED matrix, the 3V3 rail or the
/// internal I2C bus and report [`ConfigurationError::PinUnavailable`].
pub struct Board {
    slots: [Option<Peri<'static, AnyPin>>; EDGE_PINS],
    inputs: Vec<(PinId, Input<'static>), MAX_PINS>,
}

impl Board {
    pub fn new(p: Peripherals) -> Self {
        Self {
            slots: [
                Some(p.P0_02.into()), // P0
                Some(p.P0_03.into()), // P1
                Some(p.P0_04.into()), // P2
                None,                 // P3: LED column 3
                None,                 // P4: LED column 1
                Some(p.P0_14.into()), // P5: button A
                None,                 // P6: LED column 4
                None,                 // P7: LED column 2
                Some(p.P0_10.into()), // P8
                Some(p.P0_09.into()), // P9
                None,                 // P10: LED column 5
                Some(p.P0_23.into()), // P11: button B
                Some(p.P0_12.into()), // P12
                Some(p.P0_17.into()), // P13
                Some(p.P0_01.into()), // P14
                Some(p.P0_13.into()), // P15
                Some(p.P1_02.into()), // P16
                None,                 // P17: 3V3
                None,                 // P18: 3V3
                None,                 // P19: internal I2C SCL
                None,                 // P20: internal I2C SDA
            ],
            inputs: Vec::new(),
        }
    }

    /// Configured inputs with their edge-connector numbers.
    pub fn into_inputs(self) -> Vec<(PinId, Input<'static>), MAX_PINS> {
        self.inputs
    }
}

impl PinIo for Board {
    fn configure(&mut self, pin: PinId, pull: Pull) -> Result<Level, ConfigurationError> {
        let raw = self
            .slots
            .get_mut(usize::from(pin.0))
            .and_then(Option::take)
            .ok_or(ConfigurationError::PinUnavailable(pin))?;

        let input = Input::new(raw, nrf_pull(pull));
        let level = Level::from(input.is_high());
        self.inputs
            .push((pin, input))
            .map_err(|_| ConfigurationError::TooManyBindings)?;

        debug!("{} configured as input", pin.0);
        Ok(level)
    }

    /// Drops the input. A released pin cannot be configured again.
    fn release(&mut self, pin: PinId) {
        match self.inputs.iter().position(|(id, _)| *id == pin) {
            Some(index) => {
                self.inputs.swap_remove(index);
            }
            None => warn!("Release of unconfigured pin {}", pin.0),
        }
    }
}

fn nrf_pull(pull: Pull) -> NrfPull {
    match pull {
        Pull::Up => NrfPull::Up,
        Pull::Down => NrfPull::Down,
        Pull::None => NrfPull::None,
    }
}
