//! HID gamepad input report.
//!
//! The report carries the eight logical buttons in a single byte. The d-pad
//! is folded into two 2-bit signed axes so hosts see a regular gamepad:
//!
//! ```text
//! bit  7      6       5  4  3  2  1  0
//!      Start  Select  B  A  [ Y  ] [ X  ]
//! ```
//!
//! Each axis is two's complement over two bits: `0b11` is -1, `0b01` is +1,
//! `0b00` is centered. Left and Up are negative. Opposite directions held
//! together cancel out.

use crate::types::{ButtonState, Buttons, LogicalButton};

/// Report ID of the gamepad input report.
pub const REPORT_ID: u8 = 0x01;

/// Size of the encoded input report in bytes (without the report ID, which
/// HID-over-GATT carries in the report reference descriptor).
pub const INPUT_REPORT_LEN: usize = 1;

const AXIS_NEGATIVE: u8 = 0b11;
const AXIS_POSITIVE: u8 = 0b01;
const X_SHIFT: u8 = 0;
const Y_SHIFT: u8 = 2;
const FACE_BUTTONS: u8 = 0xF0;

/// Instantaneous state of all eight logical buttons.
///
/// This is the snapshot the aggregator owns and compares; [`encode`](Self::encode)
/// turns it into the bytes advertised by the report map.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadReport {
    buttons: Buttons,
}

impl GamepadReport {
    /// All buttons released.
    #[must_use]
    pub const fn released() -> Self {
        Self {
            buttons: Buttons::NONE,
        }
    }

    #[must_use]
    pub const fn from_buttons(buttons: Buttons) -> Self {
        Self { buttons }
    }

    #[inline]
    #[must_use]
    pub const fn buttons(&self) -> Buttons {
        self.buttons
    }

    #[inline]
    #[must_use]
    pub const fn state(&self, button: LogicalButton) -> ButtonState {
        self.buttons.state(button)
    }

    /// Record a button state. Returns `true` if the report content changed.
    #[inline]
    pub fn set(&mut self, button: LogicalButton, state: ButtonState) -> bool {
        let before = self.buttons;
        self.buttons.apply(button, state);
        before != self.buttons
    }

    /// Horizontal axis: -1 (left), 0 or +1 (right).
    #[must_use]
    pub const fn x_axis(&self) -> i8 {
        axis(
            self.buttons.contains(Buttons::LEFT),
            self.buttons.contains(Buttons::RIGHT),
        )
    }

    /// Vertical axis: -1 (up), 0 or +1 (down).
    #[must_use]
    pub const fn y_axis(&self) -> i8 {
        axis(
            self.buttons.contains(Buttons::UP),
            self.buttons.contains(Buttons::DOWN),
        )
    }

    /// Encode into the wire layout described by [`REPORT_MAP`](crate::REPORT_MAP).
    #[must_use]
    pub const fn encode(&self) -> [u8; INPUT_REPORT_LEN] {
        let byte = (self.buttons.raw() & FACE_BUTTONS)
            | (axis_bits(self.x_axis()) << X_SHIFT)
            | (axis_bits(self.y_axis()) << Y_SHIFT);
        [byte]
    }
}

impl From<Buttons> for GamepadReport {
    fn from(buttons: Buttons) -> Self {
        Self::from_buttons(buttons)
    }
}

const fn axis(negative: bool, positive: bool) -> i8 {
    match (negative, positive) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    }
}

const fn axis_bits(value: i8) -> u8 {
    match value {
        -1 => AXIS_NEGATIVE,
        1 => AXIS_POSITIVE,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(buttons: Buttons) -> GamepadReport {
        GamepadReport::from_buttons(buttons)
    }

    #[test]
    fn test_released_encodes_to_zero() {
        assert_eq!(GamepadReport::released().encode(), [0x00]);
    }

    #[test]
    fn test_dpad_axes() {
        assert_eq!(report(Buttons::LEFT).encode(), [0x03]);
        assert_eq!(report(Buttons::RIGHT).encode(), [0x01]);
        assert_eq!(report(Buttons::UP).encode(), [0x0C]);
        assert_eq!(report(Buttons::DOWN).encode(), [0x04]);
        assert_eq!(report(Buttons::UP | Buttons::LEFT).encode(), [0x0F]);
    }

    #[test]
    fn test_opposite_directions_cancel() {
        let r = report(Buttons::LEFT | Buttons::RIGHT | Buttons::UP | Buttons::DOWN);
        assert_eq!(r.x_axis(), 0);
        assert_eq!(r.y_axis(), 0);
        assert_eq!(r.encode(), [0x00]);
    }

    #[test]
    fn test_face_buttons_keep_their_bits() {
        assert_eq!(report(Buttons::A).encode(), [0x10]);
        assert_eq!(report(Buttons::B).encode(), [0x20]);
        assert_eq!(report(Buttons::SELECT).encode(), [0x40]);
        assert_eq!(report(Buttons::START).encode(), [0x80]);
        assert_eq!(report(Buttons::A | Buttons::START | Buttons::RIGHT).encode(), [0x91]);
    }

    #[test]
    fn test_set_reports_change() {
        let mut r = GamepadReport::released();
        assert!(r.set(LogicalButton::B, ButtonState::Pressed));
        assert!(!r.set(LogicalButton::B, ButtonState::Pressed));
        assert_eq!(r.state(LogicalButton::B), ButtonState::Pressed);
        assert!(r.set(LogicalButton::B, ButtonState::Released));
        assert_eq!(r, GamepadReport::released());
    }

    #[test]
    fn test_single_direction_flip_always_changes_wire_bytes() {
        // Every single-button change must be visible to the host.
        for bits in 0..=u8::MAX {
            let before = report(Buttons(bits));
            for button in LogicalButton::ALL {
                let mut after = before;
                let state = ButtonState::from(!before.state(button).is_pressed());
                after.set(button, state);
                assert_ne!(before.encode(), after.encode(), "{:#04x} {}", bits, button);
            }
        }
    }
}
