//! WBGT terminal: fetches an 8-line heat-stress dataset over HTTP, shows the
//! indoor or outdoor half on a 240x240 LCD and drives the backlight and
//! indicator LEDs from the risk level (0..=5).
//!
//! Everything except [`hardware`] is board-agnostic and runs on the host.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod acquisition;
pub mod config;
pub mod display;
pub mod fault;
pub mod http;
pub mod indicator;
pub mod logic;
pub mod model;
pub mod palette;
pub mod supervisor;
pub mod traits;

#[cfg(feature = "firmware")]
pub mod hardware;
