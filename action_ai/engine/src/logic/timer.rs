//! Pose-lost countdown measured in frame time
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::context::StanceEvent;

/// Abstract interface for timer behavior used by the manager (start, cancel, poll).
/// Time is whatever clock the caller passes in, normally frame timestamps.
pub trait Timer: Send {
    // Starts a countdown of `duration_ms` from `now_ms`, replacing any running one.
    fn start(&mut self, now_ms: u64, duration_ms: u64);

    // Cancels any active countdown.
    fn cancel(&mut self);

    // Checks if the timer has expired; returns a stance event if so.
    fn poll(&mut self, now_ms: u64) -> Option<StanceEvent>;
}

/// Single-deadline timer driven by frame timestamps. Fires `PoseLost` once.
#[derive(Debug, Default)]
pub struct FrameClockTimer {
    pub(crate) deadline_ms: Option<u64>,
}

impl FrameClockTimer {
    pub fn new() -> Self {
        FrameClockTimer { deadline_ms: None }
    }
}

impl Timer for FrameClockTimer {
    fn start(&mut self, now_ms: u64, duration_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(duration_ms));
    }

    fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    fn poll(&mut self, now_ms: u64) -> Option<StanceEvent> {
        if let Some(deadline) = self.deadline_ms {
            if now_ms >= deadline {
                self.deadline_ms = None;
                return Some(StanceEvent::PoseLost);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_deadline() {
        let mut timer = FrameClockTimer::new();
        timer.start(100, 1000);
        assert_eq!(timer.poll(1099), None);
        assert_eq!(timer.poll(1100), Some(StanceEvent::PoseLost));
        assert_eq!(timer.poll(5000), None);
    }

    #[test]
    fn restart_pushes_deadline_out() {
        let mut timer = FrameClockTimer::new();
        timer.start(0, 1000);
        timer.start(900, 1000);
        assert_eq!(timer.poll(1500), None);
        assert_eq!(timer.poll(1900), Some(StanceEvent::PoseLost));
    }

    #[test]
    fn cancelled_timer_stays_quiet() {
        let mut timer = FrameClockTimer::new();
        timer.start(0, 10);
        timer.cancel();
        assert_eq!(timer.poll(u64::MAX), None);
    }
}
