//! WBGT color scheme (Japanese Ministry of the Environment levels).
//!
//! Backgrounds run white, blue, light blue, yellow, orange, red. Text is white
//! on the blue and red backgrounds and black on the others.

use embedded_graphics::pixelcolor::Rgb888;
use smart_leds::RGB8;

use crate::fault::{Fault, ParseFault};
use crate::model::RiskLevel;

/// Level used to color the startup message.
pub const STATUS_LEVEL: RiskLevel = RiskLevel::MIN;
/// Level used to color fault messages.
pub const FAULT_LEVEL: RiskLevel = match RiskLevel::new(4) {
    Some(level) => level,
    None => RiskLevel::MAX,
};
/// Level used to color the final "reboot now" message.
pub const REBOOT_LEVEL: RiskLevel = match RiskLevel::new(3) {
    Some(level) => level,
    None => RiskLevel::MAX,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appearance {
    pub background: Rgb888,
    pub text: Rgb888,
    pub indicator: RGB8,
}

const fn rgb(hex: u32) -> Rgb888 {
    Rgb888::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const fn led(hex: u32) -> RGB8 {
    RGB8 {
        r: (hex >> 16) as u8,
        g: (hex >> 8) as u8,
        b: hex as u8,
    }
}

const BLACK: u32 = 0x000000;
const WHITE: u32 = 0xFFFFFF;

const fn entry(background: u32, text: u32) -> Appearance {
    Appearance {
        background: rgb(background),
        text: rgb(text),
        indicator: led(background),
    }
}

static APPEARANCES: [Appearance; 6] = [
    entry(0xFFFFFF, BLACK),
    entry(0x228CFF, WHITE),
    entry(0x9FD2FF, BLACK),
    entry(0xFAF500, BLACK),
    entry(0xFF9602, BLACK),
    entry(0xFF2900, WHITE),
];

pub fn appearance_for(level: RiskLevel) -> &'static Appearance {
    &APPEARANCES[level.value() as usize]
}

/// Lookup for a level that has not been validated yet.
pub fn appearance_for_raw(level: u8) -> Result<&'static Appearance, Fault> {
    RiskLevel::new(level)
        .map(appearance_for)
        .ok_or(Fault::Parse(ParseFault::LevelOutOfRange(level)))
}
