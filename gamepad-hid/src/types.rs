//! Core gamepad types: LogicalButton, ButtonState, Buttons.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// A semantic gamepad control, independent of physical wiring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogicalButton {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Select,
    Start,
}

impl LogicalButton {
    /// Every logical button, in report bit order of the d-pad first.
    pub const ALL: [LogicalButton; 8] = [
        LogicalButton::Up,
        LogicalButton::Down,
        LogicalButton::Right,
        LogicalButton::Left,
        LogicalButton::A,
        LogicalButton::B,
        LogicalButton::Select,
        LogicalButton::Start,
    ];

    /// Bit of this button in the [`Buttons`] bitfield.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> Buttons {
        match self {
            LogicalButton::Up => Buttons::UP,
            LogicalButton::Down => Buttons::DOWN,
            LogicalButton::Right => Buttons::RIGHT,
            LogicalButton::Left => Buttons::LEFT,
            LogicalButton::A => Buttons::A,
            LogicalButton::B => Buttons::B,
            LogicalButton::Select => Buttons::SELECT,
            LogicalButton::Start => Buttons::START,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            LogicalButton::Up => "Up",
            LogicalButton::Down => "Down",
            LogicalButton::Left => "Left",
            LogicalButton::Right => "Right",
            LogicalButton::A => "A",
            LogicalButton::B => "B",
            LogicalButton::Select => "Select",
            LogicalButton::Start => "Start",
        }
    }
}

impl core::fmt::Display for LogicalButton {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary state of one [`LogicalButton`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    Pressed,
    #[default]
    Released,
}

impl ButtonState {
    #[inline]
    #[must_use]
    pub const fn is_pressed(self) -> bool {
        matches!(self, ButtonState::Pressed)
    }
}

impl From<bool> for ButtonState {
    #[inline]
    fn from(pressed: bool) -> Self {
        if pressed {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

impl From<ButtonState> for bool {
    #[inline]
    fn from(state: ButtonState) -> Self {
        state.is_pressed()
    }
}

/// Button state represented as an 8-bit field, one bit per [`LogicalButton`].
///
/// Implements bitwise operators for ergonomic button manipulation.
///
/// # Example
///
/// ```
/// use gamepad_hid::Buttons;
///
/// let buttons = Buttons::A | Buttons::UP;
/// assert!(buttons.contains(Buttons::A));
/// assert!(buttons.contains(Buttons::UP));
/// assert!(!buttons.contains(Buttons::START));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u8);

impl Buttons {
    pub const UP: Self = Self(0x01);
    pub const DOWN: Self = Self(0x02);
    pub const RIGHT: Self = Self(0x04);
    pub const LEFT: Self = Self(0x08);
    pub const A: Self = Self(0x10);
    pub const B: Self = Self(0x20);
    pub const SELECT: Self = Self(0x40);
    pub const START: Self = Self(0x80);

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Set or clear button(s).
    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    /// Record `state` for a single logical button.
    #[inline]
    pub fn apply(&mut self, button: LogicalButton, state: ButtonState) {
        self.set(button.mask(), state.is_pressed());
    }

    /// Current state of a single logical button.
    #[inline]
    #[must_use]
    pub const fn state(self, button: LogicalButton) -> ButtonState {
        if self.contains(button.mask()) {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl From<LogicalButton> for Buttons {
    #[inline]
    fn from(button: LogicalButton) -> Self {
        button.mask()
    }
}
