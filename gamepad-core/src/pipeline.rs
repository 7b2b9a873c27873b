//! Input pipeline: Pin Monitor into Button State Mapper into a
//! [`GamepadTransport`].

use crate::config::ServiceConfig;
use crate::error::ConfigurationError;
use crate::mapper::BindingTable;
use crate::pin::{Level, PinId, PinIo, PinMonitor};
use crate::service::{ButtonChange, GamepadTransport};
use embassy_time::Instant;
use gamepad_hid::ButtonState;

/// Debounced, mapped button input.
///
/// Owns the monitored pins and the binding table. Knows nothing about the
/// report or the radio; changes go out through [`GamepadTransport`].
#[derive(Debug)]
pub struct InputPipeline {
    monitor: PinMonitor,
    table: BindingTable,
}

impl InputPipeline {
    /// Validate the bindings and configure every bound pin.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`]. Pins configured before the failure are
    /// released again.
    pub fn configure<I: PinIo>(io: &mut I, config: &ServiceConfig) -> Result<Self, ConfigurationError> {
        let table = BindingTable::new(config.bindings, config.polarity)?;
        let monitor = PinMonitor::configure(io, table.pins(), config.pull, config.debounce)?;
        info!("Input pipeline configured, {:?} pins", table.bindings().len());
        Ok(Self { monitor, table })
    }

    /// Feed a sampled level. Returns the resulting button change, if any.
    pub fn sample(&mut self, pin: PinId, level: Level, now: Instant) -> Option<ButtonChange> {
        let event = self.monitor.sample(pin, level, now)?;
        let (button, state) = self.table.map(event.pin, event.edge)?;
        debug!("{:?} {:?}", button, state);
        Some(ButtonChange { button, state })
    }

    /// [`sample`](Self::sample) and forward the change to `target`.
    pub fn drive<T: GamepadTransport>(
        &mut self,
        target: &mut T,
        pin: PinId,
        level: Level,
        now: Instant,
    ) -> Option<ButtonChange> {
        let change = self.sample(pin, level, now)?;
        target.set_button(change.button, change.state);
        Some(change)
    }

    /// Earliest time a pending level should be sampled again.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.monitor.deadline()
    }

    /// Buttons whose settled level already means pressed.
    ///
    /// The debouncers start from the level read at configuration, so a
    /// button held through start-up never produces an edge. Apply these
    /// once after [`configure`](Self::configure).
    pub fn held(&self) -> impl Iterator<Item = ButtonChange> + '_ {
        let polarity = self.table.polarity();
        self.monitor.pins().filter_map(move |pin| {
            let state = polarity.state_for_level(self.monitor.level(pin)?);
            let button = self.table.button(pin)?;
            (state == ButtonState::Pressed).then_some(ButtonChange { button, state })
        })
    }

    #[must_use]
    pub fn bindings(&self) -> &BindingTable {
        &self.table
    }

    /// Hand every pin back to `io`.
    pub fn release<I: PinIo>(mut self, io: &mut I) {
        self.monitor.release(io);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::GAMER_BIT;
    use crate::mapper::{PinBinding, Polarity};
    use crate::pin::Pull;
    use embassy_time::Duration;
    use gamepad_hid::LogicalButton;
    use std::vec;
    use std::vec::Vec;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Board where every pin idles high unless listed as reserved or held.
    #[derive(Default)]
    struct MockIo {
        reserved: Vec<PinId>,
        held: Vec<PinId>,
        configured: Vec<PinId>,
        released: Vec<PinId>,
    }

    impl PinIo for MockIo {
        fn configure(&mut self, pin: PinId, _pull: Pull) -> Result<Level, ConfigurationError> {
            if self.reserved.contains(&pin) {
                return Err(ConfigurationError::PinUnavailable(pin));
            }
            self.configured.push(pin);
            Ok(Level::from(!self.held.contains(&pin)))
        }

        fn release(&mut self, pin: PinId) {
            self.released.push(pin);
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<(LogicalButton, ButtonState)>);

    impl GamepadTransport for Recorder {
        fn set_button(&mut self, button: LogicalButton, state: ButtonState) {
            self.0.push((button, state));
        }
    }

    fn pipeline() -> InputPipeline {
        InputPipeline::configure(&mut MockIo::default(), &GAMER_BIT).unwrap()
    }

    #[test]
    fn test_configures_every_bound_pin() {
        let mut io = MockIo::default();
        let p = InputPipeline::configure(&mut io, &GAMER_BIT).unwrap();
        assert_eq!(io.configured.len(), 8);
        assert_eq!(p.bindings().bindings().len(), 8);
        assert_eq!(p.held().count(), 0);
    }

    #[test]
    fn test_fail_fast_releases_configured_pins() {
        let mut io = MockIo {
            reserved: vec![PinId(8)],
            ..MockIo::default()
        };
        let result = InputPipeline::configure(&mut io, &GAMER_BIT);
        assert_eq!(
            result.err(),
            Some(ConfigurationError::PinUnavailable(PinId(8)))
        );
        // P0, P1, P2 were configured before P8 failed.
        assert_eq!(io.released, vec![PinId(2), PinId(1), PinId(0)]);
    }

    #[test]
    fn test_press_release_press_forwarded() {
        let mut p = pipeline();
        let mut out = Recorder::default();
        let left = PinId(1);

        p.drive(&mut out, left, Level::Low, at(0));
        p.drive(&mut out, left, Level::Low, at(5));
        p.drive(&mut out, left, Level::High, at(20));
        p.drive(&mut out, left, Level::High, at(25));
        p.drive(&mut out, left, Level::Low, at(40));
        p.drive(&mut out, left, Level::Low, at(45));

        assert_eq!(
            out.0,
            vec![
                (LogicalButton::Left, ButtonState::Pressed),
                (LogicalButton::Left, ButtonState::Released),
                (LogicalButton::Left, ButtonState::Pressed),
            ]
        );
    }

    #[test]
    fn test_bounce_inside_window_is_swallowed() {
        let mut p = pipeline();
        let a = PinId(16);
        assert_eq!(p.sample(a, Level::Low, at(0)), None);
        assert_eq!(p.deadline(), Some(at(5)));
        assert_eq!(p.sample(a, Level::High, at(2)), None);
        assert_eq!(p.deadline(), None);
    }

    #[test]
    fn test_button_held_at_start_up_is_reported() {
        let mut io = MockIo {
            held: vec![PinId(16), PinId(1)],
            ..MockIo::default()
        };
        let mut p = InputPipeline::configure(&mut io, &GAMER_BIT).unwrap();
        let mut out = Recorder::default();
        for change in p.held() {
            out.set_button(change.button, change.state);
        }
        assert_eq!(
            out.0,
            vec![
                (LogicalButton::Left, ButtonState::Pressed),
                (LogicalButton::A, ButtonState::Pressed),
            ]
        );

        // Still held: no edge. Letting go releases it.
        assert_eq!(p.drive(&mut out, PinId(16), Level::Low, at(100)), None);
        p.drive(&mut out, PinId(16), Level::High, at(200));
        assert_eq!(
            p.drive(&mut out, PinId(16), Level::High, at(205)),
            Some(ButtonChange {
                button: LogicalButton::A,
                state: ButtonState::Released,
            })
        );
    }

    #[test]
    fn test_active_high_held_at_start_up() {
        static BINDINGS: [PinBinding; 2] = [
            PinBinding::new(4, LogicalButton::B),
            PinBinding::new(6, LogicalButton::Start),
        ];
        let config = ServiceConfig::new(&BINDINGS).active_high();
        // Pin 6 reads low, pin 4 idles high and so reads pressed.
        let mut io = MockIo {
            held: vec![PinId(6)],
            ..MockIo::default()
        };
        let p = InputPipeline::configure(&mut io, &config).unwrap();
        assert_eq!(
            p.held().collect::<Vec<_>>(),
            vec![ButtonChange {
                button: LogicalButton::B,
                state: ButtonState::Pressed,
            }]
        );
    }

    #[test]
    fn test_unbound_pin_does_nothing() {
        let mut p = pipeline();
        let mut out = Recorder::default();
        assert_eq!(p.drive(&mut out, PinId(3), Level::Low, at(0)), None);
        assert_eq!(p.drive(&mut out, PinId(3), Level::Low, at(10)), None);
        assert!(out.0.is_empty());
    }

    #[test]
    fn test_active_high_config() {
        static BINDINGS: [PinBinding; 1] = [PinBinding::new(4, LogicalButton::B)];
        let config = ServiceConfig::new(&BINDINGS)
            .active_high()
            .with_debounce(Duration::from_millis(0));
        let mut io = MockIo::default();
        let mut p = InputPipeline::configure(&mut io, &config).unwrap();
        assert_eq!(p.bindings().polarity(), Polarity::ActiveHigh);

        // Mock idles high, so the first settled change is a fall.
        assert_eq!(
            p.sample(PinId(4), Level::Low, at(0)),
            Some(ButtonChange {
                button: LogicalButton::B,
                state: ButtonState::Released,
            })
        );
    }

    #[test]
    fn test_release_hands_back_pins() {
        let mut io = MockIo::default();
        let p = InputPipeline::configure(&mut io, &GAMER_BIT).unwrap();
        p.release(&mut io);
        assert_eq!(io.released.len(), 8);
    }
}
