//! Advance and retreat: one step of footwork in either direction
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{
    EN_GARDE_KNEE_MAX, EN_GARDE_KNEE_MIN, GOOD_KNEE_MAX, GOOD_KNEE_MIN, STEP_DISTANCE_MARGIN,
    STEP_FAST_DURATION_MS, STEP_MAX_DURATION_MS, STEP_MIN_DISTANCE, STEP_MOVEMENT_THRESHOLD,
    STEP_REVERSE_MARGIN, STEP_WIDTH_RETENTION,
};
use crate::detect::quality::{grade, pick_feedback, FormCheck};
use crate::detect::{ActionDetector, ActionResult, DetectContext, Motion, SaberAction};
use crate::frame::PoseFrame;
use crate::motion::geometry::Band;
use log::{debug, trace};

pub(crate) const KNEES_OVER_BENT: &str = "Rise slightly, your knees are over-bent";
pub(crate) const KNEES_TOO_STRAIGHT: &str = "Bend your knees more";
const FEET_TOO_CLOSE: &str = "Keep your feet apart as you advance";

#[derive(Debug, Clone, Copy, PartialEq)]
enum StepPhase {
    Idle,
    Tracking {
        start_ms: u64,
        start_ankle_x: f32,
        start_width: f32,
    },
}

/// Tracks a single step. The same machine serves both directions.
pub struct StepDetector {
    action: SaberAction,
    /// +1.0 steps toward the opponent, -1.0 away.
    direction: f32,
    phase: StepPhase,
}

impl StepDetector {
    pub fn advance() -> Self {
        StepDetector {
            action: SaberAction::Advance,
            direction: 1.0,
            phase: StepPhase::Idle,
        }
    }

    pub fn retreat() -> Self {
        StepDetector {
            action: SaberAction::Retreat,
            direction: -1.0,
            phase: StepPhase::Idle,
        }
    }

    fn abort(&mut self, why: &str) -> ActionResult {
        debug!("{} aborted: {}", self.action, why);
        self.phase = StepPhase::Idle;
        ActionResult::None
    }

    fn finish(
        &mut self,
        motion: &Motion,
        start_ms: u64,
        displacement: f32,
        start_width: f32,
    ) -> ActionResult {
        let duration_ms = motion.now_ms().saturating_sub(start_ms);
        let mut checks = vec![
            FormCheck::band(
                motion.now.front_knee_angle(),
                Band::new(GOOD_KNEE_MIN, GOOD_KNEE_MAX),
                KNEES_OVER_BENT,
                KNEES_TOO_STRAIGHT,
            )
            .primary(),
            FormCheck::within(
                displacement,
                Band::at_least(STEP_MIN_DISTANCE * STEP_DISTANCE_MARGIN),
                None,
            ),
            FormCheck::within(
                duration_ms as f32,
                Band::at_most(STEP_FAST_DURATION_MS as f32),
                None,
            ),
        ];
        if self.action == SaberAction::Advance {
            checks.push(
                FormCheck::within(
                    motion.now.stance_width(),
                    Band::at_least(start_width * STEP_WIDTH_RETENTION),
                    Some(FEET_TOO_CLOSE),
                )
                .advisory(),
            );
        }

        let quality = grade(&checks);
        let feedback = pick_feedback(&checks);
        debug!("{} completed in {}ms: {:?}", self.action, duration_ms, quality);
        self.phase = StepPhase::Idle;
        ActionResult::Completed {
            action: self.action,
            quality,
            feedback,
            duration_ms,
        }
    }
}

impl ActionDetector for StepDetector {
    fn target_action(&self) -> SaberAction {
        self.action
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

        match self.phase {
            StepPhase::Idle => {
                let toward = motion.hip_forward_velocity() * self.direction;
                let knee = motion.now.front_knee_angle();
                if toward > STEP_MOVEMENT_THRESHOLD
                    && (EN_GARDE_KNEE_MIN..=EN_GARDE_KNEE_MAX).contains(&knee)
                {
                    trace!("{} started at {}ms", self.action, motion.now_ms());
                    self.phase = StepPhase::Tracking {
                        start_ms: motion.now_ms(),
                        start_ankle_x: motion.now.front_ankle().x,
                        start_width: motion.now.stance_width(),
                    };
                    return ActionResult::in_progress(self.action, 0.5);
                }
                ActionResult::None
            }
            StepPhase::Tracking {
                start_ms,
                start_ankle_x,
                start_width,
            } => {
                let elapsed = motion.now_ms().saturating_sub(start_ms);
                let displacement =
                    motion.forward(motion.now.front_ankle().x - start_ankle_x) * self.direction;

                if elapsed > STEP_MAX_DURATION_MS {
                    return self.abort("timed out");
                }
                if motion.hip_speed() < STEP_MOVEMENT_THRESHOLD / 2.0
                    && displacement > STEP_MIN_DISTANCE
                {
                    return self.finish(&motion, start_ms, displacement, start_width);
                }
                if displacement < STEP_REVERSE_MARGIN {
                    return self.abort("reversed");
                }
                let confidence = (0.5 + 0.4 * displacement / STEP_MIN_DISTANCE).clamp(0.5, 0.9);
                ActionResult::in_progress(self.action, confidence)
            }
        }
    }

    fn reset(&mut self) {
        self.phase = StepPhase::Idle;
    }

    fn in_progress(&self) -> bool {
        self.phase != StepPhase::Idle
    }
}
