#![no_std]
#![no_main]

use core::panic::PanicInfo;
use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock, delay::Delay, interrupt::software::SoftwareInterruptControl, rng::Rng,
    timer::timg::TimerGroup,
};
use esp_radio::wifi::WifiDevice;
use static_cell::StaticCell;

use wbgt_term::{
    config::{Settings, Timing},
    display::{Renderer, Screen},
    hardware::{
        ActiveLowLed, DisplayHardware, EmbassyClock, PixelIndicator, PwmBacklight, RtcWatchdog,
        SoftwareReset, SwitchInput, WifiSource,
    },
    logic::{Device, Terminal},
    traits::Restart,
};

const SETTINGS: Settings = Settings::from_build_env();

// XIAO ESP32-C6 wiring
//   LCD:   SCK D8/GPIO19, MOSI D10/GPIO18, RST D9/GPIO20, DC D7/GPIO17, CS D6/GPIO16
//   BLK:   D3/GPIO21 (PWM)
//   Switch D2/GPIO2 to GND, alert LED D1/GPIO1, WS2812 D0/GPIO0, user LED GPIO15

// Spin without feeding; the RTC watchdog resets the board.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    esp_println::println!("[PANIC] {:?}", info);
    let delay = Delay::new();
    loop {
        delay.delay_millis(1_000);
    }
}

esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Board bring-up failed. Waits for the watchdog.
async fn halt(reason: &str) -> ! {
    esp_println::println!("[ERROR] {}", reason);
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));
    esp_alloc::heap_allocator!(size: 72 * 1024);

    esp_println::println!("=== WBGT terminal ===");

    let timing = Timing::DEFAULT;
    let watchdog = RtcWatchdog::new(peripherals.LPWR, &timing);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    let lcd = match DisplayHardware::new(
        peripherals.SPI2,
        peripherals.GPIO16,
        peripherals.GPIO18,
        peripherals.GPIO19,
        peripherals.GPIO17,
        peripherals.GPIO20,
    )
    .and_then(DisplayHardware::into_lcd)
    {
        Ok(lcd) => lcd,
        Err(e) => halt(e).await,
    };

    let backlight = match PwmBacklight::new(peripherals.LEDC, peripherals.GPIO21) {
        Ok(backlight) => backlight,
        Err(e) => halt(e).await,
    };
    let indicator = match PixelIndicator::new(peripherals.RMT, peripherals.GPIO0) {
        Ok(indicator) => indicator,
        Err(e) => halt(e).await,
    };

    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = match esp_radio::init() {
        Ok(radio) => RADIO.init(radio),
        Err(_) => halt("Failed to initialize radio").await,
    };
    let (controller, interfaces) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(wifi) => wifi,
            Err(_) => halt("Failed to create WiFi").await,
        };

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );
    if let Err(e) = spawner.spawn(net_task(runner)) {
        esp_println::println!("[ERROR] Failed to spawn task: {:?}", e);
    }

    let device = Device {
        screen: Renderer::new(Screen::new(lcd)),
        backlight,
        indicator,
        status_led: ActiveLowLed::new(peripherals.GPIO15),
        alert_led: ActiveLowLed::new(peripherals.GPIO1),
        switch: SwitchInput::new(peripherals.GPIO2),
        watchdog,
        clock: EmbassyClock,
    };
    let source = WifiSource::new(controller, stack, SETTINGS, &timing);

    let mut terminal = Terminal::new(device, source, timing);
    let request = terminal.run().await;

    esp_println::println!("[RESET] {}", request.fault);
    SoftwareReset.restart()
}
