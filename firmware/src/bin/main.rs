#![no_std]
#![no_main]

use core::future::pending;
use core::pin::pin;

use defmt::{debug, error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, select4, Either, Either4};
use embassy_nrf::gpio::Input;
use embassy_nrf::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use gamepad_core::pin::MAX_PINS;
use heapless::Vec;
use microbit_ble_gamepad::ble::{self, Advertisement, HOST_WRITES, LINK_READY};
use microbit_ble_gamepad::{
    Board, Bonder, ButtonChange, ConnectionState, GamepadService, HostWrite, InputPipeline, Level,
    LinkError, PinId, Server, ServiceConfig, SoftdeviceLink, GAMER_BIT,
};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

#[cfg(not(feature = "active-high"))]
const CONFIG: ServiceConfig = GAMER_BIT;
#[cfg(feature = "active-high")]
const CONFIG: ServiceConfig = GAMER_BIT.active_high();

/// Retry interval for a report the SoftDevice had no buffer for.
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Pause before advertising again after the SoftDevice refused to advertise.
const ADVERTISING_BACKOFF: Duration = Duration::from_secs(1);

type Service = GamepadService<'static, SoftdeviceLink>;

/// Raw levels read after each GPIOTE edge.
static SAMPLES: Channel<CriticalSectionRawMutex, (PinId, Level), 32> = Channel::new();

/// Debounced button changes for the BLE task.
static CHANGES: Channel<CriticalSectionRawMutex, ButtonChange, 16> = Channel::new();

/// Raised by the disconnect callback. The BLE task starts the service again.
static RESTART: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static SERVER: StaticCell<Server> = StaticCell::new();
static BONDER: StaticCell<Bonder> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("micro:bit BLE gamepad starting...");

    let mut config = embassy_nrf::config::Config::default();
    // Priorities 0, 1 and 4 are reserved for the SoftDevice.
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    // --- Inputs ---
    let mut board = Board::new(p);
    let pipeline = match InputPipeline::configure(&mut board, &CONFIG) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Input configuration failed: {:?}", e);
            return;
        }
    };

    // Buttons already down at power-on never produce an edge.
    for change in pipeline.held() {
        info!("{:?} held at start-up", change.button);
        if CHANGES.try_send(change).is_err() {
            warn!("Start-up change dropped: {:?}", change);
        }
    }

    let mut levels: Vec<(PinId, Level), MAX_PINS> = Vec::new();
    for (pin, input) in board.into_inputs() {
        // Same capacity as the board's input list.
        let _ = levels.push((pin, Level::from(input.is_high())));
        spawner.spawn(pin_task(pin, input).unwrap());
    }
    spawner.spawn(input_task(pipeline, levels).unwrap());

    // --- BLE ---
    let sd = Softdevice::enable(&ble::softdevice_config());
    let server = match Server::new(sd) {
        Ok(server) => SERVER.init(server),
        Err(e) => {
            error!("GATT registration failed: {:?}", e);
            return;
        }
    };
    server.init_device_information();
    let sd: &'static Softdevice = sd;
    let bonder = BONDER.init(Bonder::default());

    spawner.spawn(softdevice_task(sd).unwrap());
    spawner.spawn(ble_task(sd, server, bonder).unwrap());

    info!("micro:bit BLE gamepad initialized, advertising...");
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Edge task - forwards the level after every edge on one pin.
#[embassy_executor::task(pool_size = 16)]
async fn pin_task(pin: PinId, mut input: Input<'static>) -> ! {
    loop {
        input.wait_for_any_edge().await;
        SAMPLES.send((pin, Level::from(input.is_high()))).await;
    }
}

/// Input task - debounces raw levels and emits button changes.
///
/// A level that has not settled yet is sampled again at the pipeline's
/// deadline, using the last level seen on that pin.
#[embassy_executor::task]
async fn input_task(mut pipeline: InputPipeline, mut levels: Vec<(PinId, Level), MAX_PINS>) -> ! {
    loop {
        let deadline = pipeline.deadline();
        let settle = async move {
            match deadline {
                Some(at) => Timer::at(at).await,
                None => pending::<()>().await,
            }
        };

        match select(SAMPLES.receive(), settle).await {
            Either::First((pin, level)) => {
                if let Some(last) = levels.iter_mut().find(|(id, _)| *id == pin) {
                    last.1 = level;
                }
                if let Some(change) = pipeline.sample(pin, level, Instant::now()) {
                    CHANGES.send(change).await;
                }
            }
            Either::Second(()) => {
                let now = Instant::now();
                for &(pin, level) in levels.iter() {
                    if let Some(change) = pipeline.sample(pin, level, now) {
                        CHANGES.send(change).await;
                    }
                }
            }
        }
    }
}

fn on_connected() {
    info!("C");
}

fn on_disconnected() {
    info!("D");
    RESTART.signal(());
}

/// BLE task - owns the gamepad service and drives it from stack events.
#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, server: &'static Server, bonder: &'static Bonder) {
    let advertisement = match Advertisement::gamepad() {
        Ok(advertisement) => advertisement,
        Err(e) => {
            error!("Advertising payload: {:?}", e);
            return;
        }
    };
    let adv_config = ble::advertising_config();

    let mut service = GamepadService::new(SoftdeviceLink::new(server));
    let registered = service
        .on_bluetooth_connected(&on_connected)
        .and_then(|()| service.on_bluetooth_disconnected(&on_disconnected));
    if let Err(e) = registered {
        error!("Callback registration failed: {:?}", e);
        return;
    }

    if let Err(e) = service.start() {
        error!("Gamepad service failed to start: {:?}", e);
        return;
    }

    loop {
        match service.connection_state() {
            ConnectionState::Disconnected => match select(RESTART.wait(), CHANGES.receive()).await {
                Either::First(()) => {
                    if let Err(e) = service.start() {
                        error!("Gamepad service failed to restart: {:?}", e);
                        return;
                    }
                }
                Either::Second(change) => service.set_button(change.button, change.state),
            },
            ConnectionState::Advertising => {
                if let Some(conn) = advertise(&mut service, sd, &advertisement, &adv_config, bonder).await {
                    session(&mut service, server, conn).await;
                }
            }
            ConnectionState::Connected => {
                warn!("Connected without a session");
                service.handle_disconnected();
            }
        }
    }
}

/// Advertise until a central connects, applying button changes meanwhile.
async fn advertise(
    service: &mut Service,
    sd: &'static Softdevice,
    advertisement: &Advertisement,
    config: &peripheral::Config,
    bonder: &'static Bonder,
) -> Option<Connection> {
    let mut advertising = pin!(peripheral::advertise_pairable(
        sd,
        advertisement.connectable(),
        config,
        bonder,
    ));

    loop {
        match select(&mut advertising, CHANGES.receive()).await {
            Either::First(Ok(conn)) => return Some(conn),
            Either::First(Err(e)) => {
                warn!("Advertising failed: {:?}", e);
                Timer::after(ADVERTISING_BACKOFF).await;
                // Fires the disconnect callback, which schedules the restart.
                service.handle_link_error(LinkError::Advertising);
                return None;
            }
            Either::Second(change) => service.set_button(change.button, change.state),
        }
    }
}

/// Serve one connection until it drops.
async fn session(service: &mut Service, server: &'static Server, conn: Connection) {
    ble::request_connection_params(&conn);
    service.link_mut().attach(conn.clone());
    LINK_READY.reset();
    service.handle_connected();

    let gatt = gatt_server::run(&conn, server, ble::on_server_event);
    let pump = async {
        while service.connection_state() == ConnectionState::Connected {
            let retry = service.has_pending();
            let backoff = async move {
                if retry {
                    Timer::after(RETRY_INTERVAL).await
                } else {
                    pending::<()>().await
                }
            };

            match select4(CHANGES.receive(), LINK_READY.wait(), HOST_WRITES.receive(), backoff).await {
                Either4::First(change) => service.set_button(change.button, change.state),
                Either4::Second(()) | Either4::Fourth(()) => service.handle_ready(),
                Either4::Third(HostWrite::ProtocolMode(mode)) => service.handle_protocol_mode(mode),
                Either4::Third(HostWrite::ControlPoint(command)) => {
                    service.handle_control_point(command)
                }
            }
        }
    };

    if let Either::First(e) = select(gatt, pump).await {
        debug!("GATT server stopped: {:?}", e);
    }

    service.handle_disconnected();
    service.link_mut().detach();
}
