//! Gamepad Report Aggregator: single owner of the gamepad report.

use gamepad_hid::{ButtonState, GamepadReport, LogicalButton};

/// Holds the current report and remembers what was last transmitted.
///
/// The current report always reflects the latest state of every button,
/// whether or not a peer is connected. [`pending`](Self::pending) only
/// yields a report when it differs from the last one sent, so repeated
/// identical updates never produce duplicate transmissions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportAggregator {
    current: GamepadReport,
    last_sent: Option<GamepadReport>,
}

impl ReportAggregator {
    /// All buttons released, nothing sent yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: GamepadReport::released(),
            last_sent: None,
        }
    }

    /// Record a button state. Returns `true` if the report content changed.
    pub fn set_button(&mut self, button: LogicalButton, state: ButtonState) -> bool {
        let changed = self.current.set(button, state);
        if changed {
            trace!("{:?} -> {:?}", button, state);
        }
        changed
    }

    /// Read-only snapshot of the current report.
    #[inline]
    #[must_use]
    pub const fn current_report(&self) -> GamepadReport {
        self.current
    }

    /// The current report, if it has not been transmitted yet.
    #[must_use]
    pub fn pending(&self) -> Option<GamepadReport> {
        match self.last_sent {
            Some(sent) if sent == self.current => None,
            _ => Some(self.current),
        }
    }

    /// Record a successful transmission.
    pub fn mark_sent(&mut self, report: GamepadReport) {
        self.last_sent = Some(report);
    }

    /// Forget the last transmission so the next send is a full resync.
    pub fn invalidate(&mut self) {
        self.last_sent = None;
    }

    /// Release every button and forget the last transmission.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamepad_hid::Buttons;

    #[test]
    fn test_new_is_released_and_pending() {
        let agg = ReportAggregator::new();
        assert_eq!(agg.current_report(), GamepadReport::released());
        assert_eq!(agg.pending(), Some(GamepadReport::released()));
    }

    #[test]
    fn test_identical_update_is_not_pending_twice() {
        let mut agg = ReportAggregator::new();
        assert!(agg.set_button(LogicalButton::A, ButtonState::Pressed));
        let report = agg.pending().unwrap();
        agg.mark_sent(report);

        assert!(!agg.set_button(LogicalButton::A, ButtonState::Pressed));
        assert_eq!(agg.pending(), None);
    }

    #[test]
    fn test_change_and_revert_before_send_is_not_pending() {
        let mut agg = ReportAggregator::new();
        agg.mark_sent(agg.current_report());
        agg.set_button(LogicalButton::B, ButtonState::Pressed);
        agg.set_button(LogicalButton::B, ButtonState::Released);
        assert_eq!(agg.pending(), None);
    }

    #[test]
    fn test_invalidate_forces_resync() {
        let mut agg = ReportAggregator::new();
        agg.set_button(LogicalButton::Up, ButtonState::Pressed);
        agg.mark_sent(agg.current_report());
        agg.invalidate();
        assert_eq!(
            agg.pending(),
            Some(GamepadReport::from_buttons(Buttons::UP))
        );
    }

    #[test]
    fn test_state_accumulates() {
        let mut agg = ReportAggregator::new();
        agg.set_button(LogicalButton::Up, ButtonState::Pressed);
        agg.set_button(LogicalButton::Start, ButtonState::Pressed);
        agg.set_button(LogicalButton::Up, ButtonState::Released);
        assert_eq!(agg.current_report().buttons(), Buttons::START);
    }

    #[test]
    fn test_reset() {
        let mut agg = ReportAggregator::new();
        agg.set_button(LogicalButton::Down, ButtonState::Pressed);
        agg.mark_sent(agg.current_report());
        agg.reset();
        assert_eq!(agg, ReportAggregator::new());
    }
}
