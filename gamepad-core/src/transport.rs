//! BLE HID Transport: connection state machine and report delivery.
//!
//! ```text
//! Disconnected --start--> Advertising --peer connects--> Connected
//!      ^                      |                              |
//!      +-------stop-----------+                              |
//!      +----------- link loss | peer disconnect | stop ------+
//! ```
//!
//! Link errors force `Disconnected` immediately. Nothing here re-advertises
//! on its own; the caller restarts explicitly.

use crate::error::{ConfigurationError, LinkError};
use gamepad_hid::{ControlPoint, GamepadReport, ProtocolMode, INPUT_REPORT_LEN};
use heapless::Vec;

/// Maximum observers per connection event.
pub const MAX_CALLBACKS: usize = 4;

/// Connection observer, invoked synchronously on the transition.
pub type Callback<'a> = &'a dyn Fn();

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Advertising,
    Connected,
}

/// Why a report write did not go out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    /// The stack cannot take another notification right now.
    Busy,
    /// The link failed.
    Link(LinkError),
}

impl From<LinkError> for WriteError {
    fn from(e: LinkError) -> Self {
        WriteError::Link(e)
    }
}

/// BLE stack adapter: advertising control and input report writes.
///
/// Implementations must not block; long-running stack work happens outside
/// and is reported back through the `handle_*` entry points.
pub trait HidLink {
    /// Begin connectable advertising.
    fn start_advertising(&mut self) -> Result<(), LinkError>;

    /// Stop advertising.
    fn stop_advertising(&mut self);

    /// Drop the current connection, if any.
    fn disconnect(&mut self);

    /// Notify the input report to the connected peer.
    fn write_report(&mut self, report: &[u8; INPUT_REPORT_LEN]) -> Result<(), WriteError>;
}

/// Result of [`HidTransport::send`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendOutcome {
    /// Written to the link.
    Sent,
    /// Link busy; send the latest state when it is ready.
    Deferred,
    /// No peer, or the host suspended the device.
    NotReady,
    /// The write failed and the transport dropped to `Disconnected`.
    LinkLost,
}

/// Connection state machine over a [`HidLink`].
pub struct HidTransport<'a, L> {
    link: L,
    state: ConnectionState,
    protocol_mode: ProtocolMode,
    suspended: bool,
    on_connected: Vec<Callback<'a>, MAX_CALLBACKS>,
    on_disconnected: Vec<Callback<'a>, MAX_CALLBACKS>,
}

impl<'a, L: HidLink> HidTransport<'a, L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            state: ConnectionState::Disconnected,
            protocol_mode: ProtocolMode::Report,
            suspended: false,
            on_connected: Vec::new(),
            on_disconnected: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn protocol_mode(&self) -> ProtocolMode {
        self.protocol_mode
    }

    #[inline]
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Register a callback for entering `Connected`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::TooManyCallbacks`] past [`MAX_CALLBACKS`].
    pub fn on_connected(&mut self, callback: Callback<'a>) -> Result<(), ConfigurationError> {
        self.on_connected
            .push(callback)
            .map_err(|_| ConfigurationError::TooManyCallbacks)
    }

    /// Register a callback for leaving `Connected`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::TooManyCallbacks`] past [`MAX_CALLBACKS`].
    pub fn on_disconnected(&mut self, callback: Callback<'a>) -> Result<(), ConfigurationError> {
        self.on_disconnected
            .push(callback)
            .map_err(|_| ConfigurationError::TooManyCallbacks)
    }

    /// Start advertising if disconnected. No-op otherwise.
    ///
    /// A link that refuses to advertise leaves the transport `Disconnected`
    /// and fires the disconnect callbacks once.
    pub fn start(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!("Transport already {:?}", self.state);
            return;
        }

        match self.link.start_advertising() {
            Ok(()) => {
                info!("Advertising");
                self.state = ConnectionState::Advertising;
            }
            Err(e) => {
                warn!("Advertising failed: {:?}", e);
                self.enter_disconnected();
            }
        }
    }

    /// Tear down to `Disconnected`. In-flight writes are abandoned.
    pub fn stop(&mut self) {
        match self.state {
            ConnectionState::Disconnected => {}
            ConnectionState::Advertising => {
                self.link.stop_advertising();
                self.state = ConnectionState::Disconnected;
                info!("Advertising stopped");
            }
            ConnectionState::Connected => {
                self.link.disconnect();
                self.enter_disconnected();
            }
        }
    }

    /// A peer connected and bonded. Returns `true` if the transport entered
    /// `Connected`, in which case the caller owes the peer a full report.
    pub fn handle_connected(&mut self) -> bool {
        match self.state {
            ConnectionState::Advertising => {
                info!("Peer connected");
                self.state = ConnectionState::Connected;
                self.protocol_mode = ProtocolMode::Report;
                self.suspended = false;
                Self::notify(&self.on_connected);
                true
            }
            ConnectionState::Connected => false,
            ConnectionState::Disconnected => {
                warn!("Connection while not advertising, dropping it");
                self.link.disconnect();
                false
            }
        }
    }

    /// The peer went away or advertising ended.
    pub fn handle_disconnected(&mut self) {
        match self.state {
            ConnectionState::Connected => self.enter_disconnected(),
            ConnectionState::Advertising => {
                debug!("Advertising ended");
                self.state = ConnectionState::Disconnected;
            }
            ConnectionState::Disconnected => {}
        }
    }

    /// Radio or stack failure: force `Disconnected`. The disconnect
    /// callbacks fire once unless the transport was already disconnected.
    pub fn handle_link_error(&mut self, error: LinkError) {
        match self.state {
            ConnectionState::Connected => {
                error!("Link error while connected: {:?}", error);
                self.link.disconnect();
                self.enter_disconnected();
            }
            ConnectionState::Advertising => {
                warn!("Link error while advertising: {:?}", error);
                self.link.stop_advertising();
                self.enter_disconnected();
            }
            ConnectionState::Disconnected => {
                debug!("Link error while disconnected: {:?}", error);
            }
        }
    }

    /// Host wrote the Protocol Mode characteristic.
    pub fn handle_protocol_mode(&mut self, mode: ProtocolMode) {
        debug!("Protocol mode {:?}", mode);
        self.protocol_mode = mode;
    }

    /// Host wrote the HID Control Point. Returns `true` when leaving suspend,
    /// in which case the caller owes the peer a full report.
    pub fn handle_control_point(&mut self, command: ControlPoint) -> bool {
        match command {
            ControlPoint::Suspend => {
                debug!("Host suspended");
                self.suspended = true;
                false
            }
            ControlPoint::ExitSuspend => {
                let resumed = self.suspended;
                debug!("Host resumed");
                self.suspended = false;
                resumed
            }
        }
    }

    /// Write `report` to the peer if connected and not suspended.
    pub fn send(&mut self, report: &GamepadReport) -> SendOutcome {
        if self.state != ConnectionState::Connected || self.suspended {
            return SendOutcome::NotReady;
        }

        match self.link.write_report(&report.encode()) {
            Ok(()) => {
                trace!("Report sent: {:?}", report);
                SendOutcome::Sent
            }
            Err(WriteError::Busy) => {
                trace!("Link busy, report deferred");
                SendOutcome::Deferred
            }
            Err(WriteError::Link(e)) => {
                self.handle_link_error(e);
                SendOutcome::LinkLost
            }
        }
    }

    fn enter_disconnected(&mut self) {
        info!("Disconnected");
        self.state = ConnectionState::Disconnected;
        self.suspended = false;
        Self::notify(&self.on_disconnected);
    }

    fn notify(callbacks: &[Callback<'a>]) {
        for callback in callbacks {
            callback();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use core::cell::{Cell, RefCell};
    use gamepad_hid::{Buttons, INPUT_REPORT_LEN};
    use std::vec;
    use std::vec::Vec;

    /// Scriptable link that records every call.
    #[derive(Default)]
    pub(crate) struct MockLink {
        pub written: Vec<[u8; INPUT_REPORT_LEN]>,
        pub advertise_result: Option<LinkError>,
        pub next_write: Vec<WriteError>,
        pub advertising_starts: usize,
        pub advertising_stops: usize,
        pub disconnects: usize,
    }

    impl HidLink for MockLink {
        fn start_advertising(&mut self) -> Result<(), LinkError> {
            self.advertising_starts += 1;
            match self.advertise_result {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        fn stop_advertising(&mut self) {
            self.advertising_stops += 1;
        }

        fn disconnect(&mut self) {
            self.disconnects += 1;
        }

        fn write_report(&mut self, report: &[u8; INPUT_REPORT_LEN]) -> Result<(), WriteError> {
            if !self.next_write.is_empty() {
                return Err(self.next_write.remove(0));
            }
            self.written.push(*report);
            Ok(())
        }
    }

    fn connected<'a>() -> HidTransport<'a, MockLink> {
        let mut t = HidTransport::new(MockLink::default());
        t.start();
        assert!(t.handle_connected());
        t
    }

    #[test]
    fn test_lifecycle() {
        let mut t = HidTransport::new(MockLink::default());
        assert_eq!(t.state(), ConnectionState::Disconnected);
        t.start();
        assert_eq!(t.state(), ConnectionState::Advertising);
        assert!(t.handle_connected());
        assert_eq!(t.state(), ConnectionState::Connected);
        t.handle_disconnected();
        assert_eq!(t.state(), ConnectionState::Disconnected);
        assert_eq!(t.link().advertising_starts, 1);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut t = HidTransport::new(MockLink::default());
        t.start();
        t.start();
        assert_eq!(t.link().advertising_starts, 1);

        assert!(t.handle_connected());
        t.start();
        assert_eq!(t.state(), ConnectionState::Connected);
        assert_eq!(t.link().advertising_starts, 1);
    }

    #[test]
    fn test_advertising_failure_reports_disconnect() {
        let link = MockLink {
            advertise_result: Some(LinkError::Advertising),
            ..MockLink::default()
        };
        let fired = Cell::new(0);
        let on_disconnected = || fired.set(fired.get() + 1);
        let mut t = HidTransport::new(link);
        t.on_disconnected(&on_disconnected).unwrap();
        t.start();
        assert_eq!(t.state(), ConnectionState::Disconnected);
        assert_eq!(fired.get(), 1);

        // Advertising works on the next attempt.
        t.link_mut().advertise_result = None;
        t.start();
        assert_eq!(t.state(), ConnectionState::Advertising);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_link_error_while_advertising_reports_disconnect() {
        let fired = Cell::new(0);
        let on_disconnected = || fired.set(fired.get() + 1);
        let mut t = HidTransport::new(MockLink::default());
        t.on_disconnected(&on_disconnected).unwrap();
        t.start();
        t.handle_link_error(LinkError::Advertising);
        assert_eq!(t.state(), ConnectionState::Disconnected);
        assert_eq!(t.link().advertising_stops, 1);
        assert_eq!(fired.get(), 1);

        // Already down: no second report.
        t.handle_link_error(LinkError::Advertising);
        t.handle_disconnected();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_stop_while_advertising() {
        let mut t = HidTransport::new(MockLink::default());
        t.start();
        t.stop();
        assert_eq!(t.state(), ConnectionState::Disconnected);
        assert_eq!(t.link().advertising_stops, 1);
    }

    #[test]
    fn test_no_automatic_readvertising() {
        let mut t = connected();
        t.handle_disconnected();
        assert_eq!(t.state(), ConnectionState::Disconnected);
        assert_eq!(t.link().advertising_starts, 1);
    }

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let log = RefCell::new(Vec::new());
        let first = || log.borrow_mut().push("first");
        let second = || log.borrow_mut().push("second");
        let gone = || log.borrow_mut().push("gone");

        let mut t = HidTransport::new(MockLink::default());
        t.on_connected(&first).unwrap();
        t.on_connected(&second).unwrap();
        t.on_disconnected(&gone).unwrap();

        t.start();
        t.handle_connected();
        t.handle_disconnected();
        assert_eq!(*log.borrow(), vec!["first", "second", "gone"]);
    }

    #[test]
    fn test_callback_capacity() {
        let noop = || {};
        let mut t = HidTransport::new(MockLink::default());
        for _ in 0..MAX_CALLBACKS {
            t.on_connected(&noop).unwrap();
        }
        assert_eq!(
            t.on_connected(&noop),
            Err(ConfigurationError::TooManyCallbacks)
        );
    }

    #[test]
    fn test_link_error_fires_disconnect_once() {
        let fired = Cell::new(0);
        let on_disconnected = || fired.set(fired.get() + 1);
        let mut t = connected();
        t.on_disconnected(&on_disconnected).unwrap();

        t.link_mut().next_write.push(WriteError::Link(LinkError::Radio));
        let report = GamepadReport::from_buttons(Buttons::A);
        assert_eq!(t.send(&report), SendOutcome::LinkLost);
        assert_eq!(t.state(), ConnectionState::Disconnected);

        // The stack reports the disconnection as well; no second callback.
        t.handle_disconnected();
        assert_eq!(fired.get(), 1);

        // No further writes are attempted.
        assert_eq!(t.send(&report), SendOutcome::NotReady);
        assert!(t.link().written.is_empty());
    }

    #[test]
    fn test_busy_write_is_deferred() {
        let mut t = connected();
        t.link_mut().next_write.push(WriteError::Busy);
        let report = GamepadReport::from_buttons(Buttons::B);
        assert_eq!(t.send(&report), SendOutcome::Deferred);
        assert_eq!(t.state(), ConnectionState::Connected);
        assert_eq!(t.send(&report), SendOutcome::Sent);
        assert_eq!(t.link().written, vec![[0x20]]);
    }

    #[test]
    fn test_suspend_blocks_sends() {
        let mut t = connected();
        assert!(!t.handle_control_point(ControlPoint::Suspend));
        assert_eq!(
            t.send(&GamepadReport::released()),
            SendOutcome::NotReady
        );
        assert!(t.handle_control_point(ControlPoint::ExitSuspend));
        assert!(!t.handle_control_point(ControlPoint::ExitSuspend));
        assert_eq!(t.send(&GamepadReport::released()), SendOutcome::Sent);
    }

    #[test]
    fn test_connection_while_stopped_is_dropped() {
        let mut t = HidTransport::new(MockLink::default());
        assert!(!t.handle_connected());
        assert_eq!(t.state(), ConnectionState::Disconnected);
        assert_eq!(t.link().disconnects, 1);
    }

    #[test]
    fn test_protocol_mode_resets_on_connect() {
        let mut t = connected();
        t.handle_protocol_mode(ProtocolMode::Boot);
        assert_eq!(t.protocol_mode(), ProtocolMode::Boot);
        t.handle_disconnected();
        t.start();
        t.handle_connected();
        assert_eq!(t.protocol_mode(), ProtocolMode::Report);
    }
}
