//! Pin Monitor: debounced edge detection on digital inputs.
//!
//! The monitor never touches hardware itself. A [`PinIo`] implementation
//! configures the pins; the platform feeds sampled levels back through
//! [`PinMonitor::sample`] whenever an edge interrupt fires or a debounce
//! [`deadline`](PinMonitor::deadline) passes.

use crate::error::ConfigurationError;
use embassy_time::{Duration, Instant};
use heapless::Vec;

/// Maximum number of monitored pins.
pub const MAX_PINS: usize = 16;

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(5);

/// Physical input identifier (edge-connector pin number).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(pub u8);

impl core::fmt::Display for PinId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    #[inline]
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Direction of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rise,
    Fall,
}

impl Edge {
    /// The edge that ends at `level`.
    #[inline]
    #[must_use]
    pub const fn into_level(level: Level) -> Self {
        match level {
            Level::High => Edge::Rise,
            Level::Low => Edge::Fall,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    #[default]
    Up,
    Down,
    None,
}

/// A settled transition on a monitored pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinEvent {
    pub pin: PinId,
    pub edge: Edge,
}

/// Digital I/O layer the monitor configures pins through.
pub trait PinIo {
    /// Configure `pin` as an edge-event input with the given pull.
    ///
    /// Returns the level read right after configuration.
    fn configure(&mut self, pin: PinId, pull: Pull) -> Result<Level, ConfigurationError>;

    /// Stop edge events on `pin` and hand it back.
    fn release(&mut self, pin: PinId);
}

/// Time-window debouncer for one input.
///
/// A new level must be observed continuously for the whole window before it
/// becomes the stable level. Each settled transition yields exactly one
/// [`Edge`]; a zero window reports the first sample of a new level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Debouncer {
    stable: Level,
    pending: Option<Instant>,
    window: Duration,
}

impl Debouncer {
    #[must_use]
    pub const fn new(initial: Level, window: Duration) -> Self {
        Self {
            stable: initial,
            pending: None,
            window,
        }
    }

    #[inline]
    #[must_use]
    pub const fn stable(&self) -> Level {
        self.stable
    }

    /// Feed a sampled level. Returns the edge once the level has settled.
    pub fn sample(&mut self, level: Level, now: Instant) -> Option<Edge> {
        if level == self.stable {
            self.pending = None;
            return None;
        }

        let since = *self.pending.get_or_insert(now);
        if now.saturating_duration_since(since) >= self.window {
            self.pending = None;
            self.stable = level;
            Some(Edge::into_level(level))
        } else {
            None
        }
    }

    /// When the pending change should be sampled again, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|since| since + self.window)
    }
}

#[derive(Debug)]
struct MonitoredPin {
    pin: PinId,
    debouncer: Debouncer,
}

/// Watches a fixed set of pins and turns sampled levels into [`PinEvent`]s.
#[derive(Debug)]
pub struct PinMonitor {
    pins: Vec<MonitoredPin, MAX_PINS>,
}

impl PinMonitor {
    /// Configure every pin in `pins`.
    ///
    /// Fails fast: on the first pin that cannot be configured, the pins
    /// already configured are released and the error names the failing pin.
    ///
    /// # Errors
    ///
    /// Whatever [`PinIo::configure`] returns, or
    /// [`ConfigurationError::TooManyBindings`] past [`MAX_PINS`].
    pub fn configure<I, P>(
        io: &mut I,
        pins: P,
        pull: Pull,
        window: Duration,
    ) -> Result<Self, ConfigurationError>
    where
        I: PinIo,
        P: IntoIterator<Item = PinId>,
    {
        let mut monitor = Self { pins: Vec::new() };

        for pin in pins {
            if monitor.pins.is_full() {
                monitor.release(io);
                return Err(ConfigurationError::TooManyBindings);
            }

            match io.configure(pin, pull) {
                Ok(initial) => {
                    debug!("Pin {:?} configured, level {:?}", pin, initial);
                    // Capacity checked above.
                    let _ = monitor.pins.push(MonitoredPin {
                        pin,
                        debouncer: Debouncer::new(initial, window),
                    });
                }
                Err(e) => {
                    error!("Pin {:?} configuration failed: {:?}", pin, e);
                    monitor.release(io);
                    return Err(e);
                }
            }
        }

        Ok(monitor)
    }

    /// Feed a sampled level for `pin`.
    ///
    /// Unknown pins are ignored.
    pub fn sample(&mut self, pin: PinId, level: Level, now: Instant) -> Option<PinEvent> {
        let Some(monitored) = self.pins.iter_mut().find(|p| p.pin == pin) else {
            trace!("Ignoring sample on unmonitored pin {:?}", pin);
            return None;
        };

        let edge = monitored.debouncer.sample(level, now)?;
        trace!("Pin {:?} settled: {:?}", pin, edge);
        Some(PinEvent { pin, edge })
    }

    /// Earliest debounce deadline across all pins.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pins.iter().filter_map(|p| p.debouncer.deadline()).min()
    }

    /// Monitored pins, in configuration order.
    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.pins.iter().map(|p| p.pin)
    }

    /// Stable level of `pin`, if monitored.
    #[must_use]
    pub fn level(&self, pin: PinId) -> Option<Level> {
        self.pins
            .iter()
            .find(|p| p.pin == pin)
            .map(|p| p.debouncer.stable())
    }

    /// Deregister every pin.
    pub fn release<I: PinIo>(&mut self, io: &mut I) {
        while let Some(monitored) = self.pins.pop() {
            io.release(monitored.pin);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec;
    use std::vec::Vec;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Board with a fixed set of usable pins, all idle high.
    struct MockIo {
        available: Vec<PinId>,
        configured: Vec<PinId>,
        released: Vec<PinId>,
    }

    impl MockIo {
        fn new(available: &[u8]) -> Self {
            Self {
                available: available.iter().map(|&n| PinId(n)).collect(),
                configured: Vec::new(),
                released: Vec::new(),
            }
        }
    }

    impl PinIo for MockIo {
        fn configure(&mut self, pin: PinId, _pull: Pull) -> Result<Level, ConfigurationError> {
            if !self.available.contains(&pin) {
                return Err(ConfigurationError::PinUnavailable(pin));
            }
            self.configured.push(pin);
            Ok(Level::High)
        }

        fn release(&mut self, pin: PinId) {
            self.released.push(pin);
        }
    }

    #[test]
    fn test_debouncer_emits_after_window() {
        let mut d = Debouncer::new(Level::High, Duration::from_millis(5));
        assert_eq!(d.sample(Level::Low, at(100)), None);
        assert_eq!(d.deadline(), Some(at(105)));
        assert_eq!(d.sample(Level::Low, at(104)), None);
        assert_eq!(d.sample(Level::Low, at(105)), Some(Edge::Fall));
        assert_eq!(d.stable(), Level::Low);
        assert_eq!(d.deadline(), None);
    }

    #[test]
    fn test_debouncer_suppresses_chatter() {
        let mut d = Debouncer::new(Level::High, Duration::from_millis(5));
        assert_eq!(d.sample(Level::Low, at(0)), None);
        assert_eq!(d.sample(Level::High, at(1)), None);
        assert_eq!(d.deadline(), None);
        assert_eq!(d.sample(Level::Low, at(2)), None);
        // Window restarts at the last bounce.
        assert_eq!(d.sample(Level::Low, at(6)), None);
        assert_eq!(d.sample(Level::Low, at(7)), Some(Edge::Fall));
    }

    #[test]
    fn test_debouncer_repeated_level_is_silent() {
        let mut d = Debouncer::new(Level::Low, Duration::from_millis(5));
        assert_eq!(d.sample(Level::Low, at(0)), None);
        assert_eq!(d.sample(Level::Low, at(50)), None);
    }

    #[test]
    fn test_zero_window_reports_immediately() {
        let mut d = Debouncer::new(Level::High, Duration::from_millis(0));
        assert_eq!(d.sample(Level::Low, at(10)), Some(Edge::Fall));
        assert_eq!(d.sample(Level::High, at(10)), Some(Edge::Rise));
    }

    #[test]
    fn test_configure_all_pins() {
        let mut io = MockIo::new(&[0, 1, 2]);
        let monitor =
            PinMonitor::configure(&mut io, [PinId(0), PinId(2)], Pull::Up, DEFAULT_DEBOUNCE)
                .unwrap();
        assert_eq!(monitor.pins().collect::<Vec<_>>(), vec![PinId(0), PinId(2)]);
        assert_eq!(monitor.level(PinId(2)), Some(Level::High));
        assert!(io.released.is_empty());
    }

    #[test]
    fn test_configure_fails_fast_and_releases() {
        let mut io = MockIo::new(&[0, 1]);
        let result = PinMonitor::configure(
            &mut io,
            [PinId(0), PinId(1), PinId(3), PinId(4)],
            Pull::Up,
            DEFAULT_DEBOUNCE,
        );
        assert_eq!(
            result.unwrap_err(),
            ConfigurationError::PinUnavailable(PinId(3))
        );
        // P4 never attempted; P0 and P1 handed back.
        assert_eq!(io.configured, vec![PinId(0), PinId(1)]);
        assert_eq!(io.released, vec![PinId(1), PinId(0)]);
    }

    #[test]
    fn test_configure_too_many_pins() {
        let all: Vec<u8> = (0..=MAX_PINS as u8).collect();
        let mut io = MockIo::new(&all);
        let result = PinMonitor::configure(
            &mut io,
            all.iter().map(|&n| PinId(n)),
            Pull::Up,
            DEFAULT_DEBOUNCE,
        );
        assert_eq!(result.unwrap_err(), ConfigurationError::TooManyBindings);
        assert_eq!(io.released.len(), MAX_PINS);
    }

    #[test]
    fn test_sample_unknown_pin_is_ignored() {
        let mut io = MockIo::new(&[0]);
        let mut monitor =
            PinMonitor::configure(&mut io, [PinId(0)], Pull::Up, Duration::from_millis(0))
                .unwrap();
        assert_eq!(monitor.sample(PinId(9), Level::Low, at(0)), None);
        assert_eq!(
            monitor.sample(PinId(0), Level::Low, at(0)),
            Some(PinEvent {
                pin: PinId(0),
                edge: Edge::Fall,
            })
        );
    }

    #[test]
    fn test_deadline_is_earliest_pending_pin() {
        let mut io = MockIo::new(&[0, 1]);
        let mut monitor = PinMonitor::configure(
            &mut io,
            [PinId(0), PinId(1)],
            Pull::Up,
            Duration::from_millis(5),
        )
        .unwrap();
        assert_eq!(monitor.deadline(), None);

        monitor.sample(PinId(1), Level::Low, at(20));
        monitor.sample(PinId(0), Level::Low, at(22));
        assert_eq!(monitor.deadline(), Some(at(25)));

        monitor.sample(PinId(1), Level::Low, at(25));
        assert_eq!(monitor.level(PinId(1)), Some(Level::Low));
        assert_eq!(monitor.deadline(), Some(at(27)));
    }

    #[test]
    fn test_release_deregisters_everything() {
        let mut io = MockIo::new(&[0, 1]);
        let mut monitor =
            PinMonitor::configure(&mut io, [PinId(0), PinId(1)], Pull::Up, DEFAULT_DEBOUNCE)
                .unwrap();
        monitor.release(&mut io);
        assert_eq!(monitor.pins().count(), 0);
        assert_eq!(io.released.len(), 2);
    }
}
