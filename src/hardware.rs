//! XIAO ESP32-C6 board support: ST7789 panel, PWM backlight, LEDs, switch,
//! RTC watchdog and the WiFi/HTTP data source.

use core::net::Ipv4Addr;

use embassy_net::{IpAddress, Stack, dns::DnsQueryType, tcp::TcpSocket};
use embassy_time::{Duration, Instant, Timer, with_timeout};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    Blocking,
    delay::Delay,
    gpio::{AnyPin, DriveMode, Input, InputConfig, Level, Output, OutputConfig, Pull},
    ledc::{
        LSGlobalClkSource, Ledc, LowSpeed,
        channel::{self as ledc_channel, ChannelIFace as _},
        timer::{self as ledc_timer, TimerIFace as _},
    },
    peripherals::{LEDC, LPWR, RMT, SPI2},
    rmt::Rmt,
    rtc_cntl::{Rtc, RwdtStage, RwdtStageAction},
    spi::{
        Mode,
        master::{Config as SpiConfig, Spi},
    },
    time::Rate,
};
use esp_hal_smartled::Ws2812SmartLeds;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use mipidsi::{
    Builder, Display,
    interface::SpiInterface,
    models::ST7789,
    options::{ColorInversion, Orientation, Rotation},
};
use smart_leds::{RGB8, SmartLedsWrite};
use static_cell::StaticCell;

use crate::config::{Settings, Timing};
use crate::fault::{Fault, NetworkFault};
use crate::http;
use crate::indicator::OFF;
use crate::model::View;
use crate::traits::{Backlight, Clock, DatasetSource, Indicator, Restart, ViewSwitch, Watchdog};

const SPI_FREQ_MHZ: u32 = 40;
const LCD_SIZE: u16 = 240;
/// The 240x240 glass sits 80 rows into the controller's 240x320 frame.
const LCD_ROW_OFFSET: u16 = 80;
const BACKLIGHT_PWM_KHZ: u32 = 20;
const SOCKET_TIMEOUT_SECS: u64 = 15;
/// One RGB pixel: 24 RMT pulses plus the end marker.
const PIXEL_BUFFER: usize = 24 + 1;

pub type LcdSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, Delay>;
pub type Lcd = Display<SpiInterface<'static, LcdSpi, Output<'static>>, ST7789, Output<'static>>;

static LCD_BUFFER: StaticCell<[u8; 512]> = StaticCell::new();
static BACKLIGHT_TIMER: StaticCell<ledc_timer::Timer<'static, LowSpeed>> = StaticCell::new();
static BACKLIGHT_CHANNEL: StaticCell<ledc_channel::Channel<'static, LowSpeed>> = StaticCell::new();

pub struct DisplayHardware {
    pub spi: LcdSpi,
    pub dc: Output<'static>,
    pub rst: Output<'static>,
    pub delay: Delay,
}

impl DisplayHardware {
    pub fn new<CS, MOSI, SCK, DC, RST>(
        spi_periph: SPI2<'static>,
        cs_gpio: CS,
        mosi_gpio: MOSI,
        sck_gpio: SCK,
        dc_gpio: DC,
        rst_gpio: RST,
    ) -> Result<Self, &'static str>
    where
        CS: Into<AnyPin<'static>>,
        MOSI: Into<AnyPin<'static>>,
        SCK: Into<AnyPin<'static>>,
        DC: Into<AnyPin<'static>>,
        RST: Into<AnyPin<'static>>,
    {
        let spi_bus = Spi::new(
            spi_periph,
            SpiConfig::default()
                .with_frequency(Rate::from_mhz(SPI_FREQ_MHZ))
                .with_mode(Mode::_0),
        )
        .map_err(|_| "Failed to configure SPI")?
        .with_sck(sck_gpio.into())
        .with_mosi(mosi_gpio.into());

        let cs = Output::new(cs_gpio.into(), Level::High, OutputConfig::default());
        let dc = Output::new(dc_gpio.into(), Level::Low, OutputConfig::default());
        let rst = Output::new(rst_gpio.into(), Level::High, OutputConfig::default());

        let spi = ExclusiveDevice::new(spi_bus, cs, Delay::new()).map_err(|_| "Failed to claim SPI device")?;

        Ok(Self {
            spi,
            dc,
            rst,
            delay: Delay::new(),
        })
    }

    /// Resets and configures the ST7789 in landscape.
    pub fn into_lcd(self) -> Result<Lcd, &'static str> {
        let Self {
            spi,
            dc,
            rst,
            mut delay,
        } = self;
        let buffer = LCD_BUFFER.init([0; 512]);
        let interface = SpiInterface::new(spi, dc, buffer);

        Builder::new(ST7789, interface)
            .display_size(LCD_SIZE, LCD_SIZE)
            .display_offset(0, LCD_ROW_OFFSET)
            .invert_colors(ColorInversion::Inverted)
            .orientation(Orientation::new().rotate(Rotation::Deg90))
            .reset_pin(rst)
            .init(&mut delay)
            .map_err(|_| "Failed to initialize ST7789")
    }
}

/// LEDC low-speed channel on the backlight pin.
pub struct PwmBacklight {
    channel: &'static ledc_channel::Channel<'static, LowSpeed>,
}

impl PwmBacklight {
    pub fn new<BLK>(ledc_periph: LEDC<'static>, blk_gpio: BLK) -> Result<Self, &'static str>
    where
        BLK: Into<AnyPin<'static>>,
    {
        let mut ledc = Ledc::new(ledc_periph);
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

        let mut timer = ledc.timer::<LowSpeed>(ledc_timer::Number::Timer0);
        timer
            .configure(ledc_timer::config::Config {
                duty: ledc_timer::config::Duty::Duty10Bit,
                clock_source: ledc_timer::LSClockSource::APBClk,
                frequency: Rate::from_khz(BACKLIGHT_PWM_KHZ),
            })
            .map_err(|_| "Failed to configure backlight timer")?;
        let timer = BACKLIGHT_TIMER.init(timer);

        let mut channel = ledc.channel::<LowSpeed>(ledc_channel::Number::Channel0, blk_gpio.into());
        channel
            .configure(ledc_channel::config::Config {
                timer: &*timer,
                duty_pct: 0,
                drive_mode: DriveMode::PushPull,
            })
            .map_err(|_| "Failed to configure backlight channel")?;

        Ok(Self {
            channel: BACKLIGHT_CHANNEL.init(channel),
        })
    }
}

impl Backlight for PwmBacklight {
    fn set_percent(&mut self, pct: u8) {
        if self.channel.set_duty(pct.min(100)).is_err() {
            log::error!("[BL] failed to set duty {}%", pct);
        }
    }
}

/// Single WS2812 pixel driven over RMT.
pub struct PixelIndicator {
    driver: Ws2812SmartLeds<'static, PIXEL_BUFFER, Blocking>,
}

impl PixelIndicator {
    pub fn new<DIN>(rmt_periph: RMT<'static>, din_gpio: DIN) -> Result<Self, &'static str>
    where
        DIN: Into<AnyPin<'static>>,
    {
        let rmt = Rmt::new(rmt_periph, Rate::from_mhz(80)).map_err(|_| "Failed to initialize RMT")?;
        let driver = Ws2812SmartLeds::<PIXEL_BUFFER, _>::new(rmt.channel0, din_gpio.into())
            .map_err(|_| "Failed to create WS2812 driver")?;
        Ok(Self { driver })
    }
}

impl Indicator for PixelIndicator {
    fn show(&mut self, color: RGB8) {
        if self.driver.write([color]).is_err() {
            log::error!("[LED] pixel write failed");
        }
    }
}

/// LED wired between the supply and the pin; driving low lights it.
pub struct ActiveLowLed {
    pin: Output<'static>,
}

impl ActiveLowLed {
    /// Starts lit; the main loop takes over on its first tick.
    pub fn new<P: Into<AnyPin<'static>>>(gpio: P) -> Self {
        Self {
            pin: Output::new(gpio.into(), Level::Low, OutputConfig::default()),
        }
    }
}

impl Indicator for ActiveLowLed {
    fn show(&mut self, color: RGB8) {
        if color == OFF {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

/// Pulled-up selector; closed (low) selects the outdoor reading.
pub struct SwitchInput {
    pin: Input<'static>,
}

impl SwitchInput {
    pub fn new<P: Into<AnyPin<'static>>>(gpio: P) -> Self {
        Self {
            pin: Input::new(gpio.into(), InputConfig::default().with_pull(Pull::Up)),
        }
    }
}

impl ViewSwitch for SwitchInput {
    fn view(&mut self) -> View {
        View::from_outdoor_flag(self.pin.is_low())
    }
}

/// RTC watchdog armed to reset the whole system.
pub struct RtcWatchdog {
    rtc: Rtc<'static>,
}

impl RtcWatchdog {
    pub fn new(lpwr: LPWR<'static>, timing: &Timing) -> Self {
        let mut rtc = Rtc::new(lpwr);
        rtc.rwdt.set_stage_action(RwdtStage::Stage0, RwdtStageAction::ResetSystem);
        rtc.rwdt.set_timeout(
            RwdtStage::Stage0,
            esp_hal::time::Duration::from_millis(timing.watchdog_timeout_ms),
        );
        rtc.rwdt.enable();
        log::info!("[WDT] armed, {} ms", timing.watchdog_timeout_ms);
        Self { rtc }
    }
}

impl Watchdog for RtcWatchdog {
    fn feed(&mut self) {
        self.rtc.rwdt.feed();
    }
}

#[derive(Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    async fn sleep_until(&mut self, deadline_ms: u64) {
        Timer::at(Instant::from_millis(deadline_ms)).await;
    }
}

pub struct SoftwareReset;

impl Restart for SoftwareReset {
    fn restart(&mut self) -> ! {
        esp_hal::system::software_reset()
    }
}

/// Fetches the dataset over WiFi, joining the network on first use and
/// reusing the association afterwards.
pub struct WifiSource {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    settings: Settings,
    fetch_timeout_ms: u64,
}

impl WifiSource {
    pub fn new(controller: WifiController<'static>, stack: Stack<'static>, settings: Settings, timing: &Timing) -> Self {
        Self {
            controller,
            stack,
            settings,
            fetch_timeout_ms: timing.fetch_timeout_ms,
        }
    }

    async fn connect(&mut self) -> Result<(), Fault> {
        if matches!(self.controller.is_connected(), Ok(true)) {
            log::info!("[WIFI] Wi-Fi is already connected");
            return Ok(());
        }
        self.settings.check_credentials()?;

        if !matches!(self.controller.is_started(), Ok(true)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(self.settings.wifi_ssid.into())
                    .with_password(self.settings.wifi_password.into()),
            );
            self.controller.set_config(&client_config).map_err(|e| {
                log::error!("[WIFI] config rejected: {:?}", e);
                NetworkFault::Connect
            })?;
            self.controller.start_async().await.map_err(|e| {
                log::error!("[WIFI] start failed: {:?}", e);
                NetworkFault::Connect
            })?;
        }

        log::info!("[WIFI] connecting to {}", self.settings.wifi_ssid);
        self.controller.connect_async().await.map_err(|e| {
            log::error!("[WIFI] connect failed: {:?}", e);
            NetworkFault::Connect
        })?;

        self.stack.wait_config_up().await;
        if let Some(config) = self.stack.config_v4() {
            log::info!("[WIFI] connected, IP {}", config.address);
        }
        Ok(())
    }

    async fn resolve(&self, host: &str) -> Result<IpAddress, Fault> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(ip));
        }
        let addresses = self.stack.dns_query(host, DnsQueryType::A).await.map_err(|e| {
            log::error!("[WIFI] DNS lookup of {} failed: {:?}", host, e);
            NetworkFault::Connect
        })?;
        addresses.first().copied().ok_or(NetworkFault::Connect.into())
    }

    async fn request(&mut self, buf: &mut [u8]) -> Result<usize, Fault> {
        let endpoint = self.settings.endpoint()?;
        self.connect().await?;
        let address = self.resolve(endpoint.host).await?;

        let mut rx_buffer = [0u8; 1024];
        let mut tx_buffer = [0u8; 256];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));
        socket.connect((address, endpoint.port)).await.map_err(|e| {
            log::error!("[HTTP] connect to {}:{} failed: {:?}", endpoint.host, endpoint.port, e);
            NetworkFault::Connect
        })?;

        let result = http::get(&mut socket, &endpoint, buf).await;
        socket.close();
        result
    }
}

impl DatasetSource for WifiSource {
    async fn fetch(&mut self, buf: &mut [u8]) -> Result<usize, Fault> {
        let timeout = Duration::from_millis(self.fetch_timeout_ms);
        match with_timeout(timeout, self.request(buf)).await {
            Ok(result) => result,
            Err(_) => {
                log::error!("[WIFI] fetch timed out after {} ms", self.fetch_timeout_ms);
                Err(NetworkFault::Connect.into())
            }
        }
    }
}
