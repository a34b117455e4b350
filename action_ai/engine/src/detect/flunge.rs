//! Flunge: a flying lunge launched from the hips with the arm already extended
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{
    ARM_EXTENDED_ANGLE, ARM_FULL_EXTENSION, FLUNGE_ARM_WAIT_MS, FLUNGE_EXTENSION_TOLERANCE_MS,
    FLUNGE_LAUNCH_VELOCITY, FLUNGE_MAX_DURATION_MS, FLUNGE_MIN_DISTANCE, FLUNGE_MIN_LEAN,
    FLUNGE_STOP_VELOCITY, LUNGE_REVERSE_MARGIN,
};
use crate::detect::quality::{grade, pick_feedback, FormCheck};
use crate::detect::{ActionDetector, ActionResult, DetectContext, Motion, SaberAction};
use crate::frame::PoseFrame;
use crate::motion::geometry::Band;
use log::{debug, info, trace};

const ARM_BENT: &str = "Extend your sword arm fully";
const NO_LEAN: &str = "Lean your weight forward";
const EARLY_EXTENSION: &str = "Your arm extended too early before the launch";
const FEET_CROSSED: &str = "Your feet crossed: that is a penalty in sabre";

#[derive(Debug, Clone, Copy, PartialEq)]
enum FlungePhase {
    Idle,
    Armed {
        extended_ms: u64,
    },
    Launching {
        launch_ms: u64,
        start_hip_x: f32,
        extended_ms: Option<u64>,
        feet_crossed: bool,
    },
}

pub struct FlungeDetector {
    phase: FlungePhase,
}

impl FlungeDetector {
    pub fn new() -> Self {
        FlungeDetector {
            phase: FlungePhase::Idle,
        }
    }

    fn abort(&mut self, why: &str) -> ActionResult {
        debug!("Flunge aborted: {}", why);
        self.phase = FlungePhase::Idle;
        ActionResult::None
    }

    fn launch(&mut self, motion: &Motion, extended_ms: Option<u64>) -> ActionResult {
        trace!("Flunge launched at {}ms", motion.now_ms());
        self.phase = FlungePhase::Launching {
            launch_ms: motion.now_ms(),
            start_hip_x: motion.prev.hip_mid().x,
            extended_ms,
            feet_crossed: motion.now.feet_crossed(),
        };
        ActionResult::in_progress(SaberAction::Flunge, 0.5)
    }
}

impl Default for FlungeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDetector for FlungeDetector {
    fn target_action(&self) -> SaberAction {
        SaberAction::Flunge
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
        let arm_extended = motion.now.weapon_elbow_angle() >= ARM_EXTENDED_ANGLE;
        let launching = motion.hip_forward_velocity() > FLUNGE_LAUNCH_VELOCITY;

        match self.phase {
            FlungePhase::Idle => {
                if launching {
                    return self.launch(&motion, arm_extended.then_some(now));
                }
                if arm_extended {
                    self.phase = FlungePhase::Armed { extended_ms: now };
                }
                ActionResult::None
            }
            FlungePhase::Armed { extended_ms } => {
                if launching {
                    return self.launch(&motion, Some(extended_ms));
                }
                if !arm_extended {
                    return self.abort("arm dropped");
                }
                if now.saturating_sub(extended_ms) > FLUNGE_ARM_WAIT_MS {
                    return self.abort("no launch");
                }
                ActionResult::None
            }
            FlungePhase::Launching {
                launch_ms,
                start_hip_x,
                extended_ms,
                feet_crossed,
            } => {
                let elapsed = now.saturating_sub(launch_ms);
                if elapsed > FLUNGE_MAX_DURATION_MS {
                    return self.abort("timed out");
                }
                let extended_ms = extended_ms.or(arm_extended.then_some(now));
                let feet_crossed = feet_crossed || motion.now.feet_crossed();
                let displacement = motion.forward(motion.now.hip_mid().x - start_hip_x);
                let stopped = motion.hip_speed() < FLUNGE_STOP_VELOCITY;

                if stopped && displacement >= FLUNGE_MIN_DISTANCE {
                    let early = extended_ms
                        .map(|t| launch_ms.saturating_sub(t) > FLUNGE_EXTENSION_TOLERANCE_MS)
                        .unwrap_or(false);
                    let checks = [
                        FormCheck::within(
                            motion.now.weapon_elbow_angle(),
                            Band::at_least(ARM_FULL_EXTENSION),
                            Some(ARM_BENT),
                        )
                        .primary(),
                        FormCheck::within(
                            motion.now.torso_lean(),
                            Band::at_least(FLUNGE_MIN_LEAN),
                            Some(NO_LEAN),
                        ),
                        FormCheck::rule(!early && !feet_crossed, None),
                    ];
                    let quality = grade(&checks);
                    // Rule violations take precedence over form advice.
                    let feedback = if feet_crossed {
                        Some(FEET_CROSSED.to_string())
                    } else if early {
                        Some(EARLY_EXTENSION.to_string())
                    } else {
                        pick_feedback(&checks)
                    };
                    if feet_crossed || early {
                        info!("Flunge rule violation: crossed={} early={}", feet_crossed, early);
                    }
                    self.phase = FlungePhase::Idle;
                    return ActionResult::Completed {
                        action: SaberAction::Flunge,
                        quality,
                        feedback,
                        duration_ms: elapsed,
                    };
                }
                if displacement < LUNGE_REVERSE_MARGIN {
                    return self.abort("reversed");
                }
                if stopped {
                    return self.abort("stalled short");
                }

                self.phase = FlungePhase::Launching {
                    launch_ms,
                    start_hip_x,
                    extended_ms,
                    feet_crossed,
                };
                let progress = (displacement / FLUNGE_MIN_DISTANCE).clamp(0.0, 1.0);
                ActionResult::in_progress(
                    SaberAction::Flunge,
                    (0.5 + 0.4 * progress).clamp(0.5, 0.9),
                )
            }
        }
    }

    fn reset(&mut self) {
        self.phase = FlungePhase::Idle;
    }

    fn in_progress(&self) -> bool {
        self.phase != FlungePhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ActionQuality;
    use crate::frame::Landmark;
    use crate::testing::{track, PoseBuilder, FRAME_MS};

    fn run(detector: &mut FlungeDetector, frames: &[PoseFrame]) -> Vec<ActionResult> {
        let ctx = DetectContext::default();
        (0..frames.len())
            .map(|i| detector.detect(&frames[i], &frames[..i], &ctx))
            .collect()
    }

    /// Still guard, `wait` frames with the arm extended, then the launch and a stop.
    fn flunge_frames(wait: u64) -> Vec<PoseFrame> {
        let base = PoseBuilder::new(0.4);
        let mut frames = track(&base, &[0.4; 5], 0);
        let extended = base.clone().elbow(160.0);
        for i in 0..wait {
            frames.push(extended.build((5 + i) * FRAME_MS));
        }
        let flying = base.elbow(170.0).lean(0.05);
        let launch = 5 + wait;
        for (i, x) in [0.43, 0.46, 0.49, 0.52, 0.55, 0.58, 0.58].iter().enumerate() {
            frames.push(flying.at(*x).build((launch + i as u64) * FRAME_MS));
        }
        frames
    }

    #[test]
    fn prompt_launch_is_perfect() {
        let mut detector = FlungeDetector::new();
        let results = run(&mut detector, &flunge_frames(1));

        assert_eq!(results[5], ActionResult::None);
        assert!(matches!(
            results[6],
            ActionResult::InProgress {
                action: SaberAction::Flunge,
                ..
            }
        ));
        assert_eq!(
            results.last(),
            Some(&ActionResult::Completed {
                action: SaberAction::Flunge,
                quality: ActionQuality::Perfect,
                feedback: None,
                duration_ms: 6 * FRAME_MS,
            })
        );
    }

    #[test]
    fn early_extension_is_flagged() {
        let results = run(&mut FlungeDetector::new(), &flunge_frames(8));
        match results.last() {
            Some(ActionResult::Completed { quality, feedback, .. }) => {
                assert_eq!(*quality, ActionQuality::Good);
                assert_eq!(feedback.as_deref(), Some(EARLY_EXTENSION));
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn crossed_feet_override_form_feedback() {
        let mut frames = flunge_frames(1);
        // Rear foot passes the front foot mid-flight.
        let crossing = &frames[8];
        let mut points = crossing.landmarks().to_vec();
        let front_x = points[crate::frame::landmark::RIGHT_ANKLE].x;
        points[crate::frame::landmark::LEFT_ANKLE] = Landmark::new(front_x + 0.05, 0.8);
        frames[8] = PoseFrame::new(points, crossing.timestamp_ms());

        match run(&mut FlungeDetector::new(), &frames).last() {
            Some(ActionResult::Completed { quality, feedback, .. }) => {
                assert_eq!(*quality, ActionQuality::Good);
                assert_eq!(feedback.as_deref(), Some(FEET_CROSSED));
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn dropped_arm_disarms() {
        let base = PoseBuilder::new(0.4);
        let mut frames = track(&base, &[0.4; 5], 0);
        frames.push(base.clone().elbow(160.0).build(5 * FRAME_MS));
        frames.push(base.build(6 * FRAME_MS));
        let mut detector = FlungeDetector::new();
        run(&mut detector, &frames[..6]);
        assert!(detector.in_progress());
        let ctx = DetectContext::default();
        detector.detect(&frames[6], &frames[..6], &ctx);
        assert!(!detector.in_progress());
    }

    #[test]
    fn ordinary_lunge_speed_is_not_a_flunge() {
        let base = PoseBuilder::new(0.4).elbow(170.0);
        let xs = [0.4, 0.4, 0.4, 0.4, 0.4, 0.42, 0.44, 0.46, 0.48, 0.5, 0.5];
        let frames = track(&base, &xs, 0);
        let results = run(&mut FlungeDetector::new(), &frames);
        assert!(results.iter().all(ActionResult::is_none));
    }
}
