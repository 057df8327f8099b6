//! Hardware abstraction traits

use smart_leds::RGB8;

use crate::fault::Fault;
use crate::model::{RiskLevel, View};

/// Trait for the text display
pub trait Surface {
    /// Clear to the level's colors and draw a single line
    fn render_status(&mut self, level: RiskLevel, message: &str) -> Result<(), &'static str>;

    /// Clear to the level's colors and draw four stacked lines
    fn render_readings(&mut self, level: RiskLevel, lines: &[&str; 4]) -> Result<(), &'static str>;
}

/// Trait for the LCD backlight
pub trait Backlight {
    fn set_percent(&mut self, pct: u8);
}

/// Trait for color indicators
///
/// Binary LEDs implement this too and light up for any non-black color.
pub trait Indicator {
    fn show(&mut self, color: RGB8);
}

/// Trait for the indoor/outdoor selector switch
pub trait ViewSwitch {
    fn view(&mut self) -> View;
}

/// Trait for the hardware watchdog
pub trait Watchdog {
    fn feed(&mut self);
}

/// Monotonic millisecond clock
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Suspend until `deadline_ms`; returns at once if it has passed.
    async fn sleep_until(&mut self, deadline_ms: u64);
}

/// Trait for whatever serves the raw dataset
#[allow(async_fn_in_trait)]
pub trait DatasetSource {
    /// Fetch the body into `buf` and return its length.
    async fn fetch(&mut self, buf: &mut [u8]) -> Result<usize, Fault>;
}

/// Trait for a full device reset
pub trait Restart {
    fn restart(&mut self) -> !;
}
