//! Gamepad service: the application-facing facade.
//!
//! [`GamepadService`] owns the [`ReportAggregator`] and the [`HidTransport`]
//! and decides when a report goes on the air:
//!
//! - on every button change while connected,
//! - once in full right after a peer connects or the host leaves suspend,
//! - again when a busy link becomes ready, carrying only the latest state.

use crate::aggregator::ReportAggregator;
use crate::error::{ConfigurationError, LinkError, ServiceError};
use crate::transport::{Callback, ConnectionState, HidLink, HidTransport, SendOutcome};
use gamepad_hid::{
    validate_report_map, ButtonState, ControlPoint, GamepadReport, LogicalButton, ProtocolMode,
    INPUT_REPORT_LEN, REPORT_MAP,
};

/// A logical button transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonChange {
    pub button: LogicalButton,
    pub state: ButtonState,
}

/// Sink for logical button updates.
///
/// The input side only knows this trait, so it can be driven against the
/// real service or a recorder in tests.
pub trait GamepadTransport {
    fn set_button(&mut self, button: LogicalButton, state: ButtonState);
}

pub struct GamepadService<'a, L> {
    aggregator: ReportAggregator,
    transport: HidTransport<'a, L>,
    started: bool,
}

impl<'a, L: HidLink> GamepadService<'a, L> {
    pub fn new(link: L) -> Self {
        Self {
            aggregator: ReportAggregator::new(),
            transport: HidTransport::new(link),
            started: false,
        }
    }

    /// Start the service and begin advertising.
    ///
    /// The first start releases every button. Later calls only re-advertise
    /// if the transport is disconnected, so a restart after link loss keeps
    /// the accumulated button state. A link that refuses to advertise is
    /// reported through the disconnect callbacks, not as an error.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Protocol`] if the report map does not describe the
    /// encoded input report.
    pub fn start(&mut self) -> Result<(), ServiceError> {
        validate_report_map(REPORT_MAP, INPUT_REPORT_LEN)?;

        if !self.started {
            self.aggregator.reset();
            self.started = true;
            info!("S");
        }

        self.transport.start();
        Ok(())
    }

    /// Tear the transport down. Pending sends are abandoned.
    pub fn stop(&mut self) {
        self.transport.stop();
        self.started = false;
    }

    /// Update one button and transmit if the report changed.
    pub fn set_button(&mut self, button: LogicalButton, state: ButtonState) {
        if self.aggregator.set_button(button, state) {
            self.flush();
        }
    }

    #[inline]
    #[must_use]
    pub fn current_report(&self) -> GamepadReport {
        self.aggregator.current_report()
    }

    #[inline]
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// `true` while a changed report is waiting for the link.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.transport.state() == ConnectionState::Connected && self.aggregator.pending().is_some()
    }

    /// Register a callback for connection.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::TooManyCallbacks`] when the list is full.
    pub fn on_bluetooth_connected(
        &mut self,
        callback: Callback<'a>,
    ) -> Result<(), ConfigurationError> {
        self.transport.on_connected(callback)
    }

    /// Register a callback for disconnection.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::TooManyCallbacks`] when the list is full.
    pub fn on_bluetooth_disconnected(
        &mut self,
        callback: Callback<'a>,
    ) -> Result<(), ConfigurationError> {
        self.transport.on_disconnected(callback)
    }

    /// A peer connected. Sends one full report.
    pub fn handle_connected(&mut self) {
        if self.transport.handle_connected() {
            self.resync();
        }
    }

    pub fn handle_disconnected(&mut self) {
        self.transport.handle_disconnected();
    }

    pub fn handle_link_error(&mut self, error: LinkError) {
        self.transport.handle_link_error(error);
    }

    /// The link can take another write.
    pub fn handle_ready(&mut self) {
        self.flush();
    }

    pub fn handle_protocol_mode(&mut self, mode: ProtocolMode) {
        self.transport.handle_protocol_mode(mode);
    }

    pub fn handle_control_point(&mut self, command: ControlPoint) {
        if self.transport.handle_control_point(command) {
            self.resync();
        }
    }

    #[inline]
    #[must_use]
    pub fn protocol_mode(&self) -> ProtocolMode {
        self.transport.protocol_mode()
    }

    pub fn link(&self) -> &L {
        self.transport.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.transport.link_mut()
    }

    fn resync(&mut self) {
        self.aggregator.invalidate();
        self.flush();
    }

    fn flush(&mut self) {
        let Some(report) = self.aggregator.pending() else {
            return;
        };

        if self.transport.send(&report) == SendOutcome::Sent {
            self.aggregator.mark_sent(report);
        }
    }
}

impl<L: HidLink> GamepadTransport for GamepadService<'_, L> {
    fn set_button(&mut self, button: LogicalButton, state: ButtonState) {
        GamepadService::set_button(self, button, state);
    }
}
