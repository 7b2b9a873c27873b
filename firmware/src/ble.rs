//! SoftDevice GATT server and the [`HidLink`] over it.

use core::cell::{Cell, RefCell};
use core::mem;

use defmt::{debug, info, warn, Format};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use gamepad_core::{HidLink, LinkError, WriteError};
use gamepad_hid::advertising::{ms_to_adv_interval_units, ADVERTISING_INTERVAL_MS};
use gamepad_hid::gatt::{
    HID_INFORMATION, INPUT_REPORT_REFERENCE, MANUFACTURER_NAME, MICROBIT_PNP_ID, MODEL_NUMBER,
    REPORT_MAP_EXTERNAL_REFERENCE,
};
use gamepad_hid::{
    AdvertisingError, AdvertisingPayload, ConnectionParams, ControlPoint, PnpId, ProtocolMode,
    INPUT_REPORT_LEN, REPORT_MAP_BYTES, REPORT_MAP_LEN,
};
use nrf_softdevice::ble::gatt_server::NotifyValueError;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{
    gatt_server, peripheral, Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode,
};
use nrf_softdevice::{raw, RawError};

/// GAP device name, also sent in the scan response.
pub const DEVICE_NAME: &str = "BBC micro:bit";

#[nrf_softdevice::gatt_service(uuid = "1812")]
pub struct HidService {
    #[characteristic(uuid = "2A4A", security = "justworks", read, value = "HID_INFORMATION")]
    pub hid_info: [u8; 4],

    #[characteristic(
        uuid = "2A4B",
        security = "justworks",
        read,
        value = "REPORT_MAP_BYTES",
        descriptor(uuid = "2907", value = "REPORT_MAP_EXTERNAL_REFERENCE")
    )]
    pub report_map: [u8; REPORT_MAP_LEN],

    #[characteristic(uuid = "2A4C", security = "justworks", write_without_response)]
    pub control_point: u8,

    #[characteristic(
        uuid = "2A4E",
        security = "justworks",
        read,
        write_without_response,
        value = "ProtocolMode::Report as u8"
    )]
    pub protocol_mode: u8,

    #[characteristic(
        uuid = "2A4D",
        security = "justworks",
        read,
        notify,
        descriptor(uuid = "2908", security = "justworks", value = "INPUT_REPORT_REFERENCE")
    )]
    pub input_report: [u8; INPUT_REPORT_LEN],
}

#[nrf_softdevice::gatt_service(uuid = "180A")]
pub struct DeviceInformationService {
    #[characteristic(uuid = "2A29", security = "justworks", read)]
    pub manufacturer_name: heapless::Vec<u8, 16>,

    #[characteristic(uuid = "2A24", security = "justworks", read)]
    pub model_number: heapless::Vec<u8, 16>,

    #[characteristic(
        uuid = "2A50",
        security = "justworks",
        read,
        value = "MICROBIT_PNP_ID.to_bytes()"
    )]
    pub pnp_id: [u8; PnpId::SIZE],
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub hid: HidService,
    pub dis: DeviceInformationService,
}

impl Server {
    /// Fill in the Device Information strings.
    pub fn init_device_information(&self) {
        for (name, result) in [
            ("manufacturer", self.dis.manufacturer_name_set(&text(MANUFACTURER_NAME))),
            ("model", self.dis.model_number_set(&text(MODEL_NUMBER))),
        ] {
            if let Err(e) = result {
                warn!("Device information {} not set: {:?}", name, e);
            }
        }
    }
}

fn text(value: &str) -> heapless::Vec<u8, 16> {
    let mut out = heapless::Vec::new();
    for &byte in value.as_bytes() {
        if out.push(byte).is_err() {
            break;
        }
    }
    out
}

/// Host write the BLE task must apply to the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Format)]
pub enum HostWrite {
    ProtocolMode(ProtocolMode),
    ControlPoint(ControlPoint),
}

/// Host writes decoded in the GATT event handler.
pub static HOST_WRITES: Channel<CriticalSectionRawMutex, HostWrite, 4> = Channel::new();

/// The host enabled notifications, or a deferred write may go through now.
pub static LINK_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Apply a GATT server event: host writes go to [`HOST_WRITES`], CCCD
/// writes raise [`LINK_READY`].
pub fn on_server_event(event: ServerEvent) {
    match event {
        ServerEvent::Hid(HidServiceEvent::InputReportCccdWrite { notifications }) => {
            info!("Input report notifications: {}", notifications);
            if notifications {
                LINK_READY.signal(());
            }
        }
        ServerEvent::Hid(HidServiceEvent::ProtocolModeWrite(value)) => {
            match ProtocolMode::try_from(value) {
                Ok(mode) => queue(HostWrite::ProtocolMode(mode)),
                Err(e) => warn!("Ignoring protocol mode {}", e.0),
            }
        }
        ServerEvent::Hid(HidServiceEvent::ControlPointWrite(value)) => {
            match ControlPoint::try_from(value) {
                Ok(command) => queue(HostWrite::ControlPoint(command)),
                Err(e) => warn!("Ignoring control point {}", e.0),
            }
        }
        _ => {}
    }
}

fn queue(write: HostWrite) {
    if HOST_WRITES.try_send(write).is_err() {
        warn!("Host write dropped: {:?}", write);
    }
}

/// SoftDevice configuration for a single peripheral link.
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            // SAFETY: all-zero is "no access" for a plain C permission struct.
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Connectable advertising at the gamepad interval.
pub fn advertising_config() -> peripheral::Config {
    peripheral::Config {
        interval: ms_to_adv_interval_units(ADVERTISING_INTERVAL_MS),
        ..Default::default()
    }
}

/// Advertising data and scan response.
pub struct Advertisement {
    pub data: AdvertisingPayload,
    pub scan_response: AdvertisingPayload,
}

impl Advertisement {
    pub fn gamepad() -> Result<Self, AdvertisingError> {
        let data = AdvertisingPayload::gamepad()?;
        let scan_response = AdvertisingPayload::new().name(DEVICE_NAME)?;
        Ok(Self {
            data,
            scan_response,
        })
    }

    pub fn connectable(&self) -> peripheral::ConnectableAdvertisement<'_> {
        peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: self.data.as_bytes(),
            scan_data: self.scan_response.as_bytes(),
        }
    }
}

/// Ask the central for the preferred connection parameters.
pub fn request_connection_params(conn: &Connection) {
    let preferred = ConnectionParams::preferred();
    let params = raw::ble_gap_conn_params_t {
        min_conn_interval: preferred.min_interval,
        max_conn_interval: preferred.max_interval,
        slave_latency: preferred.slave_latency,
        conn_sup_timeout: preferred.supervision_timeout,
    };
    if let Err(e) = conn.set_conn_params(params) {
        debug!("Connection parameter update rejected: {:?}", e);
    }
}

/// [`HidLink`] over the SoftDevice.
///
/// Advertising itself is an async SoftDevice call driven by the BLE task
/// while the service reports [`Advertising`](gamepad_core::ConnectionState);
/// the start/stop calls here only bracket it.
pub struct SoftdeviceLink {
    server: &'static Server,
    conn: Option<Connection>,
}

impl SoftdeviceLink {
    pub fn new(server: &'static Server) -> Self {
        Self { server, conn: None }
    }

    pub fn attach(&mut self, conn: Connection) {
        self.conn = Some(conn);
    }

    pub fn detach(&mut self) {
        self.conn = None;
    }
}

impl HidLink for SoftdeviceLink {
    fn start_advertising(&mut self) -> Result<(), LinkError> {
        debug!("Advertising requested");
        Ok(())
    }

    fn stop_advertising(&mut self) {
        debug!("Advertising stop requested");
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if conn.disconnect().is_err() {
                debug!("Connection already gone");
            }
        }
    }

    fn write_report(&mut self, report: &[u8; INPUT_REPORT_LEN]) -> Result<(), WriteError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or(WriteError::Link(LinkError::Disconnected))?;

        if let Err(e) = self.server.hid.input_report_set(report) {
            warn!("Input report value not stored: {:?}", e);
        }

        self.server
            .hid
            .input_report_notify(conn, report)
            .map_err(write_error)
    }
}

fn write_error(e: NotifyValueError) -> WriteError {
    match e {
        NotifyValueError::Disconnected => WriteError::Link(LinkError::Disconnected),
        // Out of TX buffers, or notifications not enabled yet.
        NotifyValueError::Raw(
            RawError::Resources | RawError::InvalidState | RawError::BleGattsSysAttrMissing,
        ) => WriteError::Busy,
        NotifyValueError::Raw(e) => {
            warn!("Notify failed: {:?}", e);
            WriteError::Link(LinkError::Radio)
        }
    }
}

#[derive(Clone, Copy)]
struct Peer {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

/// Just Works bonding with a single peer kept in RAM.
pub struct Bonder {
    peer: Cell<Option<Peer>>,
    sys_attrs: RefCell<heapless::Vec<u8, 62>>,
}

impl Default for Bonder {
    fn default() -> Self {
        Self {
            peer: Cell::new(None),
            sys_attrs: RefCell::new(heapless::Vec::new()),
        }
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::None
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn display_passkey(&self, _passkey: &[u8; 6]) {}

    fn on_security_update(&self, _conn: &Connection, security_mode: SecurityMode) {
        debug!("Security mode {:?}", security_mode);
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        info!("Bonded");
        self.sys_attrs.borrow_mut().clear();
        self.peer.set(Some(Peer {
            master_id,
            key,
            peer_id,
        }));
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.peer
            .get()
            .and_then(|peer| (master_id == peer.master_id).then_some(peer.key))
    }

    fn save_sys_attrs(&self, conn: &Connection) {
        let Some(peer) = self.peer.get() else {
            return;
        };
        if !peer.peer_id.is_match(conn.peer_address()) {
            return;
        }

        let mut sys_attrs = self.sys_attrs.borrow_mut();
        let capacity = sys_attrs.capacity();
        if sys_attrs.resize(capacity, 0).is_err() {
            return;
        }
        match gatt_server::get_sys_attrs(conn, &mut sys_attrs) {
            Ok(len) => sys_attrs.truncate(len as usize),
            Err(e) => {
                debug!("System attributes not saved: {:?}", e);
                sys_attrs.clear();
            }
        }
    }

    fn load_sys_attrs(&self, conn: &Connection) {
        let addr = conn.peer_address();
        let sys_attrs = self.sys_attrs.borrow();
        let attrs = self
            .peer
            .get()
            .filter(|peer| peer.peer_id.is_match(addr) && !sys_attrs.is_empty())
            .map(|_| sys_attrs.as_slice());

        if let Err(e) = gatt_server::set_sys_attrs(conn, attrs) {
            debug!("System attributes not loaded: {:?}", e);
        }
    }
}
