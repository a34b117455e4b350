//! Recovery: bringing the front foot back from a lunge into en garde
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{
    EN_GARDE_KNEE_MAX, EN_GARDE_KNEE_MIN, GOOD_KNEE_MAX, GOOD_KNEE_MIN, RECOVERY_FAST_MS,
    RECOVERY_MAX_DURATION_MS, RECOVERY_MIN_DISTANCE, RECOVERY_MOVEMENT_THRESHOLD,
    STEP_REVERSE_MARGIN, UPRIGHT_TOLERANCE,
};
use crate::detect::footwork::{KNEES_OVER_BENT, KNEES_TOO_STRAIGHT};
use crate::detect::quality::{grade, pick_feedback, FormCheck};
use crate::detect::{ActionDetector, ActionResult, DetectContext, Motion, SaberAction};
use crate::frame::PoseFrame;
use crate::motion::geometry::Band;
use log::{debug, trace};

const TOO_SLOW: &str = "Recover to en garde faster";
const LEANING: &str = "Keep your torso upright as you recover";

#[derive(Debug, Clone, Copy, PartialEq)]
enum RecoveryPhase {
    Idle,
    Tracking { start_ms: u64, start_ankle_x: f32 },
}

pub struct RecoveryDetector {
    phase: RecoveryPhase,
}

impl RecoveryDetector {
    pub fn new() -> Self {
        RecoveryDetector {
            phase: RecoveryPhase::Idle,
        }
    }

    fn abort(&mut self, why: &str) -> ActionResult {
        debug!("Recovery aborted: {}", why);
        self.phase = RecoveryPhase::Idle;
        ActionResult::None
    }
}

impl Default for RecoveryDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDetector for RecoveryDetector {
    fn target_action(&self) -> SaberAction {
        SaberAction::Recovery
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

        match self.phase {
            RecoveryPhase::Idle => {
                if -motion.ankle_forward_velocity() > RECOVERY_MOVEMENT_THRESHOLD {
                    trace!("Recovery started at {}ms", now);
                    self.phase = RecoveryPhase::Tracking {
                        start_ms: motion.prev.timestamp_ms(),
                        start_ankle_x: motion.prev.front_ankle().x,
                    };
                    return ActionResult::in_progress(SaberAction::Recovery, 0.5);
                }
                ActionResult::None
            }
            RecoveryPhase::Tracking {
                start_ms,
                start_ankle_x,
            } => {
                let elapsed = now.saturating_sub(start_ms);
                if elapsed > RECOVERY_MAX_DURATION_MS {
                    return self.abort("timed out");
                }
                let back = -motion.forward(motion.now.front_ankle().x - start_ankle_x);
                let knee = motion.now.front_knee_angle();
                let settled = motion.ankle_speed() < RECOVERY_MOVEMENT_THRESHOLD / 2.0
                    && back >= RECOVERY_MIN_DISTANCE
                    && (EN_GARDE_KNEE_MIN..=EN_GARDE_KNEE_MAX).contains(&knee);

                if settled {
                    let lean = motion.now.shoulder_mid().x - motion.now.hip_mid().x;
                    let checks = [
                        FormCheck::band(
                            knee,
                            Band::new(GOOD_KNEE_MIN, GOOD_KNEE_MAX),
                            KNEES_OVER_BENT,
                            KNEES_TOO_STRAIGHT,
                        )
                        .primary(),
                        FormCheck::within(
                            elapsed as f32,
                            Band::at_most(RECOVERY_FAST_MS as f32),
                            Some(TOO_SLOW),
                        ),
                        FormCheck::within(
                            lean.abs(),
                            Band::at_most(UPRIGHT_TOLERANCE),
                            Some(LEANING),
                        ),
                    ];
                    let quality = grade(&checks);
                    debug!("Recovery completed in {}ms: {:?}", elapsed, quality);
                    self.phase = RecoveryPhase::Idle;
                    return ActionResult::Completed {
                        action: SaberAction::Recovery,
                        quality,
                        feedback: pick_feedback(&checks),
                        duration_ms: elapsed,
                    };
                }
                if back < STEP_REVERSE_MARGIN {
                    return self.abort("reversed");
                }
                let confidence = (0.5 + 0.4 * back / RECOVERY_MIN_DISTANCE).clamp(0.5, 0.9);
                ActionResult::in_progress(SaberAction::Recovery, confidence)
            }
        }
    }

    fn reset(&mut self) {
        self.phase = RecoveryPhase::Idle;
    }

    fn in_progress(&self) -> bool {
        self.phase != RecoveryPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ActionQuality;
    use crate::testing::{track, PoseBuilder, FRAME_MS};

    fn run(detector: &mut RecoveryDetector, frames: &[PoseFrame]) -> Vec<ActionResult> {
        let ctx = DetectContext::default();
        (0..frames.len())
            .map(|i| detector.detect(&frames[i], &frames[..i], &ctx))
            .collect()
    }

    /// Five frames held in a lunge, then the front foot comes back into `guard`.
    fn recovery_frames(guard: PoseBuilder) -> Vec<PoseFrame> {
        let lunge = PoseBuilder::new(0.6).front_knee(90.0).rear_knee(170.0);
        let mut frames = track(&lunge, &[0.6; 5], 0);
        for (i, x) in [0.58, 0.56, 0.54, 0.52, 0.52].iter().enumerate() {
            frames.push(guard.at(*x).build((5 + i as u64) * FRAME_MS));
        }
        frames
    }

    #[test]
    fn clean_recovery_is_perfect() {
        let mut detector = RecoveryDetector::new();
        let results = run(&mut detector, &recovery_frames(PoseBuilder::new(0.0)));
        assert_eq!(results[5], ActionResult::in_progress(SaberAction::Recovery, 0.5));
        assert_eq!(
            results[9],
            ActionResult::Completed {
                action: SaberAction::Recovery,
                quality: ActionQuality::Perfect,
                feedback: None,
                duration_ms: 5 * FRAME_MS,
            }
        );
        assert!(!detector.in_progress());
    }

    #[test]
    fn leaning_recovery_is_coached() {
        let results = run(
            &mut RecoveryDetector::new(),
            &recovery_frames(PoseBuilder::new(0.0).lean(0.08)),
        );
        match &results[9] {
            ActionResult::Completed { quality, feedback, .. } => {
                assert_eq!(*quality, ActionQuality::Good);
                assert_eq!(feedback.as_deref(), Some(LEANING));
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn holding_the_lunge_is_not_a_recovery() {
        let lunge = PoseBuilder::new(0.6).front_knee(90.0).rear_knee(170.0);
        let frames = track(&lunge, &[0.6; 12], 0);
        assert!(run(&mut RecoveryDetector::new(), &frames).iter().all(ActionResult::is_none));
    }
}
