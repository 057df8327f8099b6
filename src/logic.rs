//! Main loop (hardware-independent)
//!
//! One outer cycle: feed the watchdog, fetch, set the backlight, then run
//! `loop_count` ticks that poll the switch, drive the LEDs and repaint the
//! screen when the selected reading changed.

use crate::acquisition;
use crate::config::Timing;
use crate::display::Renderer;
use crate::fault::Fault;
use crate::indicator::{self, Blinker};
use crate::palette::STATUS_LEVEL;
use crate::supervisor::{FaultSupervisor, RestartRequest};
use crate::traits::{Backlight, Clock, DatasetSource, Indicator, Surface, ViewSwitch, Watchdog};

/// Receive buffer for one HTTP response, headers included.
pub const RESPONSE_CAPACITY: usize = 1024;

pub const STARTUP_MESSAGE: &str = " INITIALIZE";

/// Everything the terminal drives, owned in one place.
pub struct Device<S, B, L, A, V, W, C> {
    pub screen: Renderer<S>,
    pub backlight: B,
    /// Addressable LED that breathes in the level color.
    pub indicator: L,
    pub status_led: A,
    pub alert_led: A,
    pub switch: V,
    pub watchdog: W,
    pub clock: C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub backlight_on: bool,
    /// Number of ticks that repainted the screen.
    pub redraws: u32,
}

pub struct Terminal<S, B, L, A, V, W, C, F> {
    device: Device<S, B, L, A, V, W, C>,
    source: F,
    timing: Timing,
    supervisor: FaultSupervisor,
    blinker: Blinker,
    buf: [u8; RESPONSE_CAPACITY],
}

impl<S, B, L, A, V, W, C, F> Terminal<S, B, L, A, V, W, C, F>
where
    S: Surface,
    B: Backlight,
    L: Indicator,
    A: Indicator,
    V: ViewSwitch,
    W: Watchdog,
    C: Clock,
    F: DatasetSource,
{
    pub fn new(device: Device<S, B, L, A, V, W, C>, source: F, timing: Timing) -> Self {
        Self {
            device,
            source,
            supervisor: FaultSupervisor::new(&timing),
            timing,
            blinker: Blinker::new(),
            buf: [0; RESPONSE_CAPACITY],
        }
    }

    pub fn device(&self) -> &Device<S, B, L, A, V, W, C> {
        &self.device
    }

    pub fn supervisor(&self) -> &FaultSupervisor {
        &self.supervisor
    }

    /// Lights the panel and both LEDs, then shows the startup message.
    pub fn initialize(&mut self) {
        self.device.backlight.set_percent(self.timing.backlight_pct);
        self.device.status_led.show(indicator::LIT);
        self.device.alert_led.show(indicator::LIT);
        if let Err(e) = self.device.screen.status(STATUS_LEVEL, STARTUP_MESSAGE) {
            log::error!("[LCD] {}", e);
        }
    }

    /// Runs until the first fault and returns once the fault has been shown
    /// for the reboot delay.
    pub async fn run(&mut self) -> RestartRequest {
        self.initialize();

        let fault = match self.timing.validate() {
            Err(reason) => Fault::Configuration(reason),
            Ok(()) => loop {
                if let Err(fault) = self.run_cycle().await {
                    break fault;
                }
            },
        };

        // The fault screen must be readable even after a night cycle
        let device = &mut self.device;
        device.backlight.set_percent(self.timing.backlight_pct);
        self.supervisor
            .fail(fault, &mut device.screen, &mut device.watchdog, &mut device.clock)
            .await
    }

    /// One fetch followed by one full display cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, Fault> {
        self.supervisor.feed(&mut self.device.watchdog);
        let dataset = acquisition::fetch_dataset(&mut self.source, &mut self.buf).await?;

        let level = dataset.indoor().level();
        let hour = dataset.hour();
        let backlight_on = indicator::evaluate(level, hour, 0, &self.timing).backlight_on;
        let duty = if backlight_on { self.timing.backlight_pct } else { 0 };
        log::info!("[BL] level {} at {}h -> {}%", level.value(), hour, duty);
        self.device.backlight.set_percent(duty);

        let start = self.device.clock.now_ms();
        let mut redraws = 0;
        for phase in 0..self.timing.loop_count {
            let frame = indicator::evaluate(level, hour, phase, &self.timing);
            self.device.indicator.show(frame.indicator_color);

            let blink = self.blinker.tick(level);
            self.device.status_led.show(indicator::on_off(blink.status_led));
            self.device.alert_led.show(indicator::on_off(blink.alert_led));

            let view = self.device.switch.view();
            match self.device.screen.show(dataset.reading(view)) {
                Ok(true) => redraws += 1,
                Ok(false) => {}
                Err(e) => log::error!("[LCD] {}", e),
            }

            let deadline = start + self.timing.tick_deadline_ms(phase);
            self.device.clock.sleep_until(deadline).await;
        }

        Ok(CycleReport {
            backlight_on,
            redraws,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RiskLevel, View};
    use crate::supervisor::SupervisorState;
    use embassy_futures::block_on;
    use smart_leds::RGB8;
    use std::string::{String, ToString};
    use std::vec::Vec;

    #[derive(Default)]
    struct Frames(Vec<String>);

    impl Surface for Frames {
        fn render_status(&mut self, _: RiskLevel, message: &str) -> Result<(), &'static str> {
            self.0.push(message.to_string());
            Ok(())
        }

        fn render_readings(&mut self, _: RiskLevel, lines: &[&str; 4]) -> Result<(), &'static str> {
            self.0.push(lines[0].to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Duty(Option<u8>);

    impl Backlight for Duty {
        fn set_percent(&mut self, pct: u8) {
            self.0 = Some(pct);
        }
    }

    #[derive(Default)]
    struct Led(Vec<RGB8>);

    impl Indicator for Led {
        fn show(&mut self, color: RGB8) {
            self.0.push(color);
        }
    }

    struct Fixed(View);

    impl ViewSwitch for Fixed {
        fn view(&mut self) -> View {
            self.0
        }
    }

    #[derive(Default)]
    struct Feeds(u32);

    impl Watchdog for Feeds {
        fn feed(&mut self) {
            self.0 += 1;
        }
    }

    #[derive(Default)]
    struct Ticks {
        now: u64,
        deadlines: Vec<u64>,
    }

    impl Clock for Ticks {
        fn now_ms(&self) -> u64 {
            self.now
        }

        async fn sleep_until(&mut self, deadline_ms: u64) {
            self.deadlines.push(deadline_ms);
            self.now = self.now.max(deadline_ms);
        }
    }

    struct Body(&'static str);

    impl DatasetSource for Body {
        async fn fetch(&mut self, buf: &mut [u8]) -> Result<usize, Fault> {
            let bytes = self.0.as_bytes();
            buf[..bytes.len()].copy_from_slice(bytes);
            Ok(bytes.len())
        }
    }

    type TestTerminal = Terminal<Frames, Duty, Led, Led, Fixed, Feeds, Ticks, Body>;

    fn terminal(body: &'static str, view: View, timing: Timing) -> TestTerminal {
        let device = Device {
            screen: Renderer::new(Frames::default()),
            backlight: Duty::default(),
            indicator: Led::default(),
            status_led: Led::default(),
            alert_led: Led::default(),
            switch: Fixed(view),
            watchdog: Feeds::default(),
            clock: Ticks::default(),
        };
        Terminal::new(device, Body(body), timing)
    }

    const DANGER_AT_NIGHT: &str =
        "ROOM 02:00\n33.0C 70%\nWBGT 31.5\nlevel: 5\nLIB. 02:00\n30.0C 80%\nWBGT 29.0\nlevel: 4\n";

    #[test]
    fn cycle_paints_once_and_schedules_from_cycle_start() {
        let mut t = terminal(DANGER_AT_NIGHT, View::Outdoor, Timing::DEFAULT);
        let report = block_on(t.run_cycle()).unwrap();

        assert_eq!(
            report,
            CycleReport {
                backlight_on: true,
                redraws: 1
            }
        );
        let device = t.device();
        assert_eq!(device.screen.surface().0, ["LIB. 02:00"]);
        assert_eq!(device.backlight.0, Some(10));
        assert_eq!(device.clock.deadlines.len(), 50);
        assert_eq!(device.clock.deadlines[0], 200);
        assert_eq!(device.clock.deadlines[49], 10_000);
        assert_eq!(device.watchdog.0, 1);
    }

    #[test]
    fn max_level_blinks_leds_in_opposite_phase() {
        let mut t = terminal(DANGER_AT_NIGHT, View::Indoor, Timing::DEFAULT);
        block_on(t.run_cycle()).unwrap();

        let device = t.device();
        let status = &device.status_led.0;
        let alert = &device.alert_led.0;
        assert_eq!(status.len(), 50);
        for (s, a) in status.iter().zip(alert) {
            assert_ne!(s, a);
        }
        assert_ne!(status[0], status[1]);
        assert_eq!(alert[0], indicator::LIT);
    }

    #[test]
    fn invalid_timing_is_a_configuration_fault() {
        let timing = Timing {
            loop_count: 1,
            ..Timing::DEFAULT
        };
        let mut t = terminal(DANGER_AT_NIGHT, View::Indoor, timing);
        let request = block_on(t.run());

        assert!(matches!(request.fault, Fault::Configuration(_)));
        assert_eq!(
            t.device().screen.surface().0,
            [STARTUP_MESSAGE, "CONFIG err", "reboot now"]
        );
        assert_eq!(t.supervisor().state(), SupervisorState::Restarting(request.fault));
    }

    #[test]
    fn bad_body_stops_the_loop() {
        let mut t = terminal("ROOM 07:15\n", View::Indoor, Timing::DEFAULT);
        let request = block_on(t.run());

        assert_eq!(request.fault.message(), "VALUE err");
        assert_eq!(
            t.device().screen.surface().0,
            [STARTUP_MESSAGE, "VALUE err", "reboot now"]
        );
        assert_eq!(t.device().backlight.0, Some(10));
    }

    #[test]
    fn initialize_lights_panel_and_leds_before_first_fetch() {
        let mut t = terminal(DANGER_AT_NIGHT, View::Indoor, Timing::DEFAULT);
        t.initialize();

        let device = t.device();
        assert_eq!(device.backlight.0, Some(10));
        assert_eq!(device.status_led.0, [indicator::LIT]);
        assert_eq!(device.alert_led.0, [indicator::LIT]);
        assert_eq!(device.screen.surface().0, [STARTUP_MESSAGE]);
        assert_eq!(device.watchdog.0, 0);
    }
}
