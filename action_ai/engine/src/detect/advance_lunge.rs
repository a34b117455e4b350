//! Advance-lunge: a short forward step chained into a lunge
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{
    COMBO_CHAIN_WINDOW_MS, COMBO_MAX_DURATION_MS, COMBO_STEP_MIN_DISTANCE, EN_GARDE_KNEE_MAX,
    EN_GARDE_KNEE_MIN, STEP_MOVEMENT_THRESHOLD, STEP_REVERSE_MARGIN,
};
use crate::detect::lunge::{grade_lunge, LungeStep, LungeTracker};
use crate::detect::{ActionDetector, ActionResult, DetectContext, Motion, SaberAction};
use crate::frame::PoseFrame;
use log::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ComboPhase {
    Idle,
    Stepping { start_ankle_x: f32 },
    StepDone { since_ms: u64 },
    Lunging(LungeTracker),
}

pub struct AdvanceLungeDetector {
    phase: ComboPhase,
    /// Start of the preparatory step; the whole action is timed from here.
    start_ms: u64,
}

impl AdvanceLungeDetector {
    pub fn new() -> Self {
        AdvanceLungeDetector {
            phase: ComboPhase::Idle,
            start_ms: 0,
        }
    }

    fn abort(&mut self, why: &str) -> ActionResult {
        debug!("Advance-lunge aborted: {}", why);
        self.reset();
        ActionResult::None
    }
}

impl Default for AdvanceLungeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDetector for AdvanceLungeDetector {
    fn target_action(&self) -> SaberAction {
        SaberAction::AdvanceLunge
    }

    fn detect(
        &mut self,
        current: &PoseFrame,
        history: &[PoseFrame],
        ctx: &DetectContext,
    ) -> ActionResult {
        let Some(motion) = Motion::new(current, history, ctx) else {
            return ActionResult::None;
        };
        let now = motion.now_ms();

        if self.phase != ComboPhase::Idle
            && now.saturating_sub(self.start_ms) > COMBO_MAX_DURATION_MS
        {
            return self.abort("timed out");
        }

        match self.phase {
            ComboPhase::Idle => {
                let knee = motion.now.front_knee_angle();
                if motion.hip_forward_velocity() > STEP_MOVEMENT_THRESHOLD
                    && !LungeTracker::takes_off(&motion)
                    && (EN_GARDE_KNEE_MIN..=EN_GARDE_KNEE_MAX).contains(&knee)
                {
                    trace!("Advance-lunge step started at {}ms", now);
                    self.start_ms = now;
                    self.phase = ComboPhase::Stepping {
                        start_ankle_x: motion.now.front_ankle().x,
                    };
                    return ActionResult::in_progress(SaberAction::Advance, 0.3);
                }
                ActionResult::None
            }
            ComboPhase::Stepping { start_ankle_x } => {
                let displacement = motion.forward(motion.now.front_ankle().x - start_ankle_x);
                if displacement >= COMBO_STEP_MIN_DISTANCE {
                    self.phase = ComboPhase::StepDone { since_ms: now };
                    return ActionResult::in_progress(SaberAction::Advance, 0.5);
                }
                if LungeTracker::takes_off(&motion) {
                    return self.abort("lunged without a step");
                }
                if displacement < STEP_REVERSE_MARGIN {
                    return self.abort("reversed");
                }
                if motion.hip_speed() < STEP_MOVEMENT_THRESHOLD / 2.0 {
                    return self.abort("step stalled");
                }
                let progress = (displacement / COMBO_STEP_MIN_DISTANCE).clamp(0.0, 1.0);
                ActionResult::in_progress(
                    SaberAction::Advance,
                    (0.3 + 0.2 * progress).clamp(0.3, 0.5),
                )
            }
            ComboPhase::StepDone { since_ms } => {
                if let Some(tracker) = LungeTracker::trigger(&motion) {
                    trace!("Advance-lunge chained into a lunge at {}ms", now);
                    self.phase = ComboPhase::Lunging(tracker);
                    return ActionResult::in_progress(SaberAction::Lunging, 0.6);
                }
                if now.saturating_sub(since_ms) > COMBO_CHAIN_WINDOW_MS {
                    return self.abort("no lunge after the step");
                }
                // The step is over; waiting for the lunge is not an action.
                ActionResult::None
            }
            ComboPhase::Lunging(tracker) => match tracker.step(&motion) {
                LungeStep::Moving(progress) => ActionResult::in_progress(
                    SaberAction::Lunging,
                    (0.6 + 0.3 * progress).clamp(0.6, 0.9),
                ),
                LungeStep::Landed => {
                    let (quality, feedback) = grade_lunge(&motion.now);
                    let duration_ms = now.saturating_sub(self.start_ms);
                    debug!("Advance-lunge completed in {}ms: {:?}", duration_ms, quality);
                    self.reset();
                    ActionResult::Completed {
                        action: SaberAction::AdvanceLunge,
                        quality,
                        feedback,
                        duration_ms,
                    }
                }
                LungeStep::Aborted(why) => self.abort(why),
            },
        }
    }

    fn reset(&mut self) {
        self.phase = ComboPhase::Idle;
        self.start_ms = 0;
    }

    fn in_progress(&self) -> bool {
        self.phase != ComboPhase::Idle
    }
}
