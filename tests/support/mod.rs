//! Recording fakes for driving a `Terminal` on the host.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_io_async::{ErrorType, Read, Write};
use smart_leds::RGB8;

use wbgt_term::config::Timing;
use wbgt_term::display::Renderer;
use wbgt_term::fault::{Fault, NetworkFault};
use wbgt_term::http::{self, Endpoint};
use wbgt_term::logic::{Device, Terminal};
use wbgt_term::model::{RiskLevel, View};
use wbgt_term::traits::{Backlight, Clock, DatasetSource, Indicator, Surface, ViewSwitch, Watchdog};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Feed,
    Fetch,
    Status { level: u8, message: String },
    Readings { level: u8, lines: [String; 4] },
    Backlight(u8),
    Pixel(RGB8),
    StatusLed(RGB8),
    AlertLed(RGB8),
    Sleep(u64),
}

pub type Timeline = Rc<RefCell<Vec<Event>>>;

pub struct FakeSurface(pub Timeline);

impl Surface for FakeSurface {
    fn render_status(&mut self, level: RiskLevel, message: &str) -> Result<(), &'static str> {
        self.0.borrow_mut().push(Event::Status {
            level: level.value(),
            message: message.to_string(),
        });
        Ok(())
    }

    fn render_readings(&mut self, level: RiskLevel, lines: &[&str; 4]) -> Result<(), &'static str> {
        self.0.borrow_mut().push(Event::Readings {
            level: level.value(),
            lines: lines.map(str::to_string),
        });
        Ok(())
    }
}

pub struct FakeBacklight(pub Timeline);

impl Backlight for FakeBacklight {
    fn set_percent(&mut self, pct: u8) {
        self.0.borrow_mut().push(Event::Backlight(pct));
    }
}

/// Records under whichever event the constructor picks.
pub struct FakeLed {
    timeline: Timeline,
    event: fn(RGB8) -> Event,
}

impl Indicator for FakeLed {
    fn show(&mut self, color: RGB8) {
        self.timeline.borrow_mut().push((self.event)(color));
    }
}

/// Outdoor from the given tick on; indoor before it.
pub struct FakeSwitch {
    pub ticks: usize,
    pub outdoor_from: Option<usize>,
}

impl ViewSwitch for FakeSwitch {
    fn view(&mut self) -> View {
        let outdoor = self.outdoor_from.is_some_and(|from| self.ticks >= from);
        self.ticks += 1;
        View::from_outdoor_flag(outdoor)
    }
}

pub struct FakeWatchdog(pub Timeline);

impl Watchdog for FakeWatchdog {
    fn feed(&mut self) {
        self.0.borrow_mut().push(Event::Feed);
    }
}

/// Jumps straight to each deadline.
pub struct FakeClock {
    pub now: Rc<Cell<u64>>,
    pub timeline: Timeline,
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    async fn sleep_until(&mut self, deadline_ms: u64) {
        self.timeline.borrow_mut().push(Event::Sleep(deadline_ms));
        self.now.set(self.now.get().max(deadline_ms));
    }
}

/// Byte stream replaying one raw HTTP response.
pub struct Canned {
    response: Vec<u8>,
}

impl ErrorType for Canned {
    type Error = Infallible;
}

impl Read for Canned {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.response.len().min(buf.len()).min(64);
        buf[..n].copy_from_slice(&self.response[..n]);
        self.response.drain(..n);
        Ok(n)
    }
}

impl Write for Canned {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }
}

/// HTTP server stand-in: each fetch consumes the next queued response and
/// takes `latency_ms` of fake time. An empty queue is a connect failure.
pub struct FakeServer {
    pub responses: VecDeque<Vec<u8>>,
    pub latency_ms: Rc<Cell<u64>>,
    pub now: Rc<Cell<u64>>,
    pub timeline: Timeline,
}

impl DatasetSource for FakeServer {
    async fn fetch(&mut self, buf: &mut [u8]) -> Result<usize, Fault> {
        self.timeline.borrow_mut().push(Event::Fetch);
        self.now.set(self.now.get() + self.latency_ms.get());
        let response = self.responses.pop_front().ok_or(NetworkFault::Connect)?;
        let endpoint = Endpoint::parse("http://wbgt.local/data.txt")?;
        http::get(&mut Canned { response }, &endpoint, buf).await
    }
}

pub fn ok(body: &str) -> Vec<u8> {
    format!("HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\n{}", body).into_bytes()
}

pub fn status(code: u16) -> Vec<u8> {
    format!("HTTP/1.1 {} Error\r\nContent-Length: 0\r\n\r\n", code).into_bytes()
}

pub fn dataset(hour: &str, indoor: u8, outdoor: u8) -> String {
    format!(
        "ROOM {hour}\n28.1C 65%\nWBGT 25.3\nlevel: {indoor}\nLIB. {hour}\n31.0C 70%\nWBGT 28.9\nlevel: {outdoor}\n"
    )
}

pub type FakeTerminal =
    Terminal<FakeSurface, FakeBacklight, FakeLed, FakeLed, FakeSwitch, FakeWatchdog, FakeClock, FakeServer>;

pub struct Rig {
    pub terminal: FakeTerminal,
    pub timeline: Timeline,
    pub now: Rc<Cell<u64>>,
    /// Fake time each fetch takes.
    pub latency_ms: Rc<Cell<u64>>,
}

impl Rig {
    pub fn new(responses: Vec<Vec<u8>>, outdoor_from: Option<usize>) -> Self {
        Self::with_timing(responses, outdoor_from, Timing::DEFAULT)
    }

    pub fn with_timing(responses: Vec<Vec<u8>>, outdoor_from: Option<usize>, timing: Timing) -> Self {
        let timeline: Timeline = Rc::default();
        let now = Rc::new(Cell::new(0));
        let latency_ms = Rc::new(Cell::new(0));
        let device = Device {
            screen: Renderer::new(FakeSurface(timeline.clone())),
            backlight: FakeBacklight(timeline.clone()),
            indicator: FakeLed {
                timeline: timeline.clone(),
                event: Event::Pixel,
            },
            status_led: FakeLed {
                timeline: timeline.clone(),
                event: Event::StatusLed,
            },
            alert_led: FakeLed {
                timeline: timeline.clone(),
                event: Event::AlertLed,
            },
            switch: FakeSwitch {
                ticks: 0,
                outdoor_from,
            },
            watchdog: FakeWatchdog(timeline.clone()),
            clock: FakeClock {
                now: now.clone(),
                timeline: timeline.clone(),
            },
        };
        let server = FakeServer {
            responses: responses.into(),
            latency_ms: latency_ms.clone(),
            now: now.clone(),
            timeline: timeline.clone(),
        };
        Self {
            terminal: Terminal::new(device, server, timing),
            timeline,
            now,
            latency_ms,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.timeline.borrow().clone()
    }

    /// Screen updates only, in order.
    pub fn frames(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Status { .. } | Event::Readings { .. }))
            .collect()
    }

    pub fn pixels(&self) -> Vec<RGB8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Pixel(color) => Some(color),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.timeline.borrow_mut().clear();
    }
}

pub fn status_frame(level: u8, message: &str) -> Event {
    Event::Status {
        level,
        message: message.to_string(),
    }
}
