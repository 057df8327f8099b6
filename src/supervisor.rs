//! Fault handling and the bounded path to a restart.
//!
//! Every fault ends the same way: the message is shown in the fault colors,
//! the watchdog is left unfed, and after the reboot delay the device restarts.
//! The watchdog timeout is longer than the reboot delay, so it only fires if
//! the software restart itself never happens.

use crate::config::Timing;
use crate::display::Renderer;
use crate::fault::Fault;
use crate::palette::{FAULT_LEVEL, REBOOT_LEVEL};
use crate::traits::{Clock, Surface, Watchdog};

pub const REBOOT_MESSAGE: &str = "reboot now";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Faulted(Fault),
    Restarting(Fault),
}

/// Returned once the device is ready to be reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the device must be restarted"]
pub struct RestartRequest {
    pub fault: Fault,
}

pub struct FaultSupervisor {
    state: SupervisorState,
    reboot_delay_ms: u64,
}

impl FaultSupervisor {
    pub fn new(timing: &Timing) -> Self {
        Self {
            state: SupervisorState::Running,
            reboot_delay_ms: timing.reboot_delay_ms,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Feeds the watchdog while no fault has been raised.
    pub fn feed<W: Watchdog>(&mut self, watchdog: &mut W) -> bool {
        if self.state == SupervisorState::Running {
            watchdog.feed();
            true
        } else {
            false
        }
    }

    /// Shows the fault, waits out the reboot delay and asks for a restart.
    ///
    /// The watchdog gets one last feed so the full reboot delay fits inside
    /// its window. Display errors are logged and otherwise ignored.
    pub async fn fail<S, W, C>(
        &mut self,
        fault: Fault,
        screen: &mut Renderer<S>,
        watchdog: &mut W,
        clock: &mut C,
    ) -> RestartRequest
    where
        S: Surface,
        W: Watchdog,
        C: Clock,
    {
        self.feed(watchdog);
        self.state = SupervisorState::Faulted(fault);
        log::warn!("[FAULT] {} ({})", fault.message(), fault);

        if let Err(e) = screen.status(FAULT_LEVEL, fault.message()) {
            log::error!("[FAULT] display failed: {}", e);
        }

        let deadline = clock.now_ms() + self.reboot_delay_ms;
        clock.sleep_until(deadline).await;

        log::warn!("[FAULT] {}", REBOOT_MESSAGE);
        if let Err(e) = screen.status(REBOOT_LEVEL, REBOOT_MESSAGE) {
            log::error!("[FAULT] display failed: {}", e);
        }
        self.state = SupervisorState::Restarting(fault);

        RestartRequest { fault }
    }
}
