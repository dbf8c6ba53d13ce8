//! Embedded entry point for the RP2040.
//!
//! Three Embassy tasks around one shared [`Engine`]:
//!   - `serial_task` reads UART bytes into the engine and flushes its
//!     responses (echoes, prompts, notifications) back out,
//!   - `tick_task` runs the 1 ms update cycle and pushes each assembled
//!     report to the USB HID endpoint,
//!   - `usb_task` services enumeration and the endpoints.
//!
//! The physical-mouse path (USB host port) is a separate subsystem that
//! calls `Engine::observe_physical` with raw button bits and deltas; it is
//! not wired up on boards without the second USB port.

#![no_std]
#![no_main]

use defmt::{info, unwrap, warn};
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{UART0, USB};
use embassy_rp::uart::{self, BufferedInterruptHandler, BufferedUart, BufferedUartRx, BufferedUartTx};
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Instant, Ticker, Timer};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State};
use embassy_usb::{Builder, Config, UsbDevice};
use embedded_io_async::{Read, Write};
use static_cell::StaticCell;

use km2usb::config;
use km2usb::report::{MOUSE_REPORT_DESCRIPTOR, MOUSE_REPORT_SIZE};
use km2usb::Engine;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

type SharedEngine = Mutex<CriticalSectionRawMutex, Engine>;

static ENGINE: StaticCell<SharedEngine> = StaticCell::new();
static MOUSE_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static UART_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static UART_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // USB HID device.
    let driver = Driver::new(p.USB, Irqs);

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        USB_CONFIG_DESC.init([0u8; 256]),
        USB_BOS_DESC.init([0u8; 256]),
        USB_MSOS_DESC.init([0u8; 256]),
        USB_CTRL_BUF.init([0u8; 128]),
    );

    let hid_config = HidConfig {
        report_descriptor: MOUSE_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let mouse_writer = HidWriter::<_, 8>::new(&mut builder, MOUSE_STATE.init(State::new()), hid_config);

    let device = builder.build();

    // Serial command channel.
    let mut uart_config = uart::Config::default();
    uart_config.baudrate = config::UART_BAUD;
    let uart = BufferedUart::new(
        p.UART0,
        Irqs,
        p.PIN_0,
        p.PIN_1,
        UART_TX_BUF.init([0u8; 256]),
        UART_RX_BUF.init([0u8; 256]),
        uart_config,
    );
    let (uart_rx, uart_tx) = uart.split();

    let engine = ENGINE.init(Mutex::new(Engine::new()));

    info!("km2usb up: UART command channel at {} baud", config::UART_BAUD);

    unwrap!(spawner.spawn(usb_task(device)));
    unwrap!(spawner.spawn(serial_task(engine, uart_rx, uart_tx)));
    unwrap!(spawner.spawn(tick_task(engine, mouse_writer)));
}

#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, Driver<'static, USB>>) -> ! {
    device.run().await
}

/// Feed received bytes into the engine and flush its pending responses.
/// The flush also runs on a short timeout so notifications produced by the
/// tick task go out promptly even when the line is quiet.
#[embassy_executor::task]
async fn serial_task(
    engine: &'static SharedEngine,
    mut rx: BufferedUartRx<'static, UART0>,
    mut tx: BufferedUartTx<'static, UART0>,
) -> ! {
    let mut rx_buf = [0u8; 64];
    let mut tx_buf = [0u8; 128];
    loop {
        match select(rx.read(&mut rx_buf), Timer::after(Duration::from_millis(1))).await {
            Either::First(Ok(n)) if n > 0 => {
                engine.lock().await.feed(&rx_buf[..n]);
            }
            Either::First(Ok(_)) => {}
            Either::First(Err(_)) => warn!("UART read failed"),
            Either::Second(()) => {}
        }

        loop {
            let n = engine.lock().await.drain_tx(&mut tx_buf);
            if n == 0 {
                break;
            }
            if tx.write_all(&tx_buf[..n]).await.is_err() {
                warn!("UART write failed");
                break;
            }
        }
    }
}

/// 1 ms update cycle: advance the engine and transmit the report.
#[embassy_executor::task]
async fn tick_task(
    engine: &'static SharedEngine,
    mut mouse: HidWriter<'static, Driver<'static, USB>, 8>,
) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(config::USB_HID_POLL_MS as u64));
    let mut buf = [0u8; MOUSE_REPORT_SIZE];
    loop {
        ticker.next().await;
        let report = engine.lock().await.tick(Instant::now().as_millis());
        let n = report.serialize(&mut buf);
        if let Err(_e) = mouse.write(&buf[..n]).await {
            warn!("USB mouse write failed");
        }
    }
}
