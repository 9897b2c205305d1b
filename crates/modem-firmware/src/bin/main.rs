#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_futures::join::join3;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::timer::timg::TimerGroup;
use log::info;
use static_cell::StaticCell;

use modem_core::{EventChannel, ModemConfig, ModemController, SharedModem};
use modem_firmware::board::{self, FirmwareModem};
use modem_firmware::tasks;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static MODEM_EVENTS: EventChannel = EventChannel::new();
static MODEM: StaticCell<FirmwareModem> = StaticCell::new();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let modem_config = ModemConfig::default();

    let reset = board::reset_line(peripherals.GPIO5);
    let hook = board::hook_line(peripherals.GPIO6);
    let uart = board::modem_uart(peripherals.UART1, peripherals.GPIO18, peripherals.GPIO17)
        .expect("Failed to configure modem UART");

    // Detection blocks for about a second, before any tick runs.
    let mut delay = Delay::new();
    let controller = ModemController::boot(reset, hook, uart, &mut delay, modem_config)
        .expect("Modem hardware failure during detection");

    info!("Modem detection: {:?}", controller.detection());

    let modem: &'static FirmwareModem = MODEM.init(SharedModem::new(controller, &MODEM_EVENTS));

    join3(
        tasks::run_fast_ticks(modem, modem_config.fast_tick_period()),
        tasks::run_slow_ticks(modem, modem_config.slow_tick_period()),
        tasks::handle_events(modem),
    )
    .await;

    unreachable!("modem loops never return")
}
