//! Build-time settings and loop timing.

use crate::fault::Fault;
use crate::http::Endpoint;

/// Network credentials and data source, baked in from the build environment
/// (`WIFI_SSID`, `WIFI_PASSWORD`, `DATA_SOURCE`).
///
/// Missing values still build; they surface as a configuration fault on the
/// first fetch so the device shows it on screen instead of failing silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    pub data_url: &'static str,
}

const fn or_empty(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => "",
    }
}

impl Settings {
    pub const fn from_build_env() -> Self {
        Self {
            wifi_ssid: or_empty(option_env!("WIFI_SSID")),
            wifi_password: or_empty(option_env!("WIFI_PASSWORD")),
            data_url: or_empty(option_env!("DATA_SOURCE")),
        }
    }

    pub fn check_credentials(&self) -> Result<(), Fault> {
        if self.wifi_ssid.is_empty() {
            return Err(Fault::Configuration("WIFI_SSID not set"));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Result<Endpoint<'static>, Fault> {
        if self.data_url.is_empty() {
            return Err(Fault::Configuration("DATA_SOURCE not set"));
        }
        Endpoint::parse(self.data_url)
    }
}

/// Slack left for repaints that overrun their tick.
pub const FEED_MARGIN_MS: u64 = 2_000;

/// Loop and watchdog timing. All durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Inner iterations per fetch.
    pub loop_count: u32,
    /// Switch polling interval; loop_count * tick_ms is roughly 10 s.
    pub tick_ms: u64,
    pub watchdog_timeout_ms: u64,
    /// Time the fault message stays up before rebooting.
    pub reboot_delay_ms: u64,
    /// Upper bound for one fetch, including joining the network.
    pub fetch_timeout_ms: u64,
    /// Backlight PWM duty when lit. Full brightness is glaring.
    pub backlight_pct: u8,
    /// Peak of the indicator brightness envelope.
    pub indicator_max_pct: u8,
}

impl Timing {
    pub const DEFAULT: Timing = Timing {
        loop_count: 50,
        tick_ms: 200,
        watchdog_timeout_ms: 30_000,
        reboot_delay_ms: 20_000,
        fetch_timeout_ms: 15_000,
        backlight_pct: 10,
        indicator_max_pct: 20,
    };

    /// Checks that the watchdog can never elapse during normal operation or
    /// before the fault message has been shown.
    pub const fn validate(&self) -> Result<(), &'static str> {
        if self.loop_count < 2 {
            return Err("loop_count must be at least 2");
        }
        if self.reboot_delay_ms >= self.watchdog_timeout_ms {
            return Err("reboot delay must be shorter than the watchdog timeout");
        }
        if self.fetch_timeout_ms >= self.watchdog_timeout_ms {
            return Err("fetch timeout must be shorter than the watchdog timeout");
        }
        if self.loop_count as u64 * self.tick_ms >= self.watchdog_timeout_ms {
            return Err("display cycle must be shorter than the watchdog timeout");
        }
        // The watchdog is fed once per cycle, before the fetch
        let between_feeds = self.fetch_timeout_ms + self.loop_count as u64 * self.tick_ms;
        if between_feeds + FEED_MARGIN_MS > self.watchdog_timeout_ms {
            return Err("fetch plus display cycle must fit between watchdog feeds");
        }
        if self.backlight_pct > 100 || self.indicator_max_pct > 100 {
            return Err("brightness is a percentage");
        }
        Ok(())
    }

    /// Time from cycle start to the deadline of `phase`.
    pub const fn tick_deadline_ms(&self, phase: u32) -> u64 {
        (phase as u64 + 1) * self.tick_ms
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = assert!(Timing::DEFAULT.validate().is_ok());
