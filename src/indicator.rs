//! Backlight and indicator LED behaviour derived from the risk level.
//!
//! The backlight and addressable indicator are on during the day (06:00 to
//! 20:59) and always on at the maximum level. The indicator "breathes" over
//! each display cycle: brightest at both ends, dark at the midpoint. At the
//! maximum level the on-board and alert LEDs also blink in opposite phase.

use smart_leds::RGB8;

use crate::config::Timing;
use crate::model::RiskLevel;
use crate::palette;

pub const DAY_START_HOUR: u8 = 6;
pub const DAY_END_HOUR: u8 = 20;

pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };
pub const LIT: RGB8 = RGB8 {
    r: 0xFF,
    g: 0xFF,
    b: 0xFF,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorFrame {
    pub backlight_on: bool,
    pub indicator_color: RGB8,
}

pub fn is_enabled(level: RiskLevel, hour: u8) -> bool {
    level.is_max() || (DAY_START_HOUR..=DAY_END_HOUR).contains(&hour)
}

/// Triangle envelope in per-mille of full brightness:
/// `max_pct * |phase - n/2| / (n/2)`.
pub fn envelope_permille(phase: u32, cycle_len: u32, max_pct: u8) -> u32 {
    let (num, den) = envelope_ratio(phase, cycle_len, max_pct);
    ((num * 1000 + den / 2) / den) as u32
}

// Use u64 intermediates; `num / den` is the brightness fraction.
fn envelope_ratio(phase: u32, cycle_len: u32, max_pct: u8) -> (u64, u64) {
    let max = max_pct.min(100) as u64;
    let half = (cycle_len / 2) as u64;
    if half == 0 {
        return (max, 100);
    }
    let distance = (phase as u64).abs_diff(half).min(half);
    (max * distance, 100 * half)
}

/// Scale every channel by the envelope, rounding to the nearest step.
pub fn scale(color: RGB8, phase: u32, cycle_len: u32, max_pct: u8) -> RGB8 {
    let (num, den) = envelope_ratio(phase, cycle_len, max_pct);
    let channel = |c: u8| ((c as u64 * num + den / 2) / den) as u8;
    RGB8 {
        r: channel(color.r),
        g: channel(color.g),
        b: channel(color.b),
    }
}

/// Backlight decision and indicator color for one tick.
pub fn evaluate(level: RiskLevel, hour: u8, phase: u32, timing: &Timing) -> IndicatorFrame {
    let enabled = is_enabled(level, hour);
    let indicator_color = if enabled {
        let base = palette::appearance_for(level).indicator;
        scale(base, phase, timing.loop_count, timing.indicator_max_pct)
    } else {
        OFF
    };
    IndicatorFrame {
        backlight_on: enabled,
        indicator_color,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkFrame {
    pub status_led: bool,
    pub alert_led: bool,
}

/// Alternating blink of the two binary LEDs at the maximum level.
#[derive(Debug, Clone)]
pub struct Blinker {
    lit: bool,
}

impl Default for Blinker {
    fn default() -> Self {
        Self::new()
    }
}

impl Blinker {
    /// The on-board LED is lit at power-on.
    pub const fn new() -> Self {
        Self { lit: true }
    }

    pub fn tick(&mut self, level: RiskLevel) -> BlinkFrame {
        if level.is_max() {
            self.lit = !self.lit;
            BlinkFrame {
                status_led: self.lit,
                alert_led: !self.lit,
            }
        } else {
            self.lit = false;
            BlinkFrame {
                status_led: false,
                alert_led: false,
            }
        }
    }
}

pub const fn on_off(lit: bool) -> RGB8 {
    if lit { LIT } else { OFF }
}
