//! Balestra-lunge: a forward jump whose landing launches a lunge
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{
    BALESTRA_CHAIN_WINDOW_MS, BALESTRA_LAND_TOLERANCE, BALESTRA_MAX_AIRTIME_MS, BALESTRA_MIN_LIFT,
    COMBO_MAX_DURATION_MS, STEP_MOVEMENT_THRESHOLD,
};
use crate::detect::lunge::{grade_lunge, LungeStep, LungeTracker};
use crate::detect::{ActionDetector, ActionResult, DetectContext, Motion, SaberAction};
use crate::frame::PoseFrame;
use log::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq)]
enum BalestraPhase {
    Idle,
    /// Both feet off the floor. Ground level is fixed at take-off.
    Airborne {
        front_ground_y: f32,
        rear_ground_y: f32,
    },
    Landed {
        landed_ms: u64,
    },
    Lunging(LungeTracker),
}

pub struct BalestraLungeDetector {
    phase: BalestraPhase,
    takeoff_ms: u64,
}

impl BalestraLungeDetector {
    pub fn new() -> Self {
        BalestraLungeDetector {
            phase: BalestraPhase::Idle,
            takeoff_ms: 0,
        }
    }

    fn abort(&mut self, why: &str) -> ActionResult {
        debug!("Balestra-lunge aborted: {}", why);
        self.reset();
        ActionResult::None
    }
}

impl Default for BalestraLungeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean ankle heights over the history: (front, rear).
fn ground_level(motion: &Motion) -> (f32, f32) {
    let (mut front, mut rear, mut n) = (0.0, 0.0, 0usize);
    for skeleton in motion.past() {
        front += skeleton.front_ankle().y;
        rear += skeleton.rear_ankle().y;
        n += 1;
    }
    if n == 0 {
        return (motion.now.front_ankle().y, motion.now.rear_ankle().y);
    }
    (front / n as f32, rear / n as f32)
}

impl ActionDetector for BalestraLungeDetector {
    fn target_action(&self) -> SaberAction {
        SaberAction::BalestraLunge
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
        let front_y = motion.now.front_ankle().y;
        let rear_y = motion.now.rear_ankle().y;

        if self.phase != BalestraPhase::Idle
            && now.saturating_sub(self.takeoff_ms) > COMBO_MAX_DURATION_MS
        {
            return self.abort("timed out");
        }

        match self.phase {
            BalestraPhase::Idle => {
                let (front_ground_y, rear_ground_y) = ground_level(&motion);
                // y grows downward, so a lifted foot has a smaller y.
                let lifted = front_ground_y - front_y >= BALESTRA_MIN_LIFT
                    && rear_ground_y - rear_y >= BALESTRA_MIN_LIFT;
                if lifted && motion.hip_forward_velocity() > STEP_MOVEMENT_THRESHOLD {
                    trace!("Balestra take-off at {}ms", now);
                    self.takeoff_ms = now;
                    self.phase = BalestraPhase::Airborne {
                        front_ground_y,
                        rear_ground_y,
                    };
                    return ActionResult::in_progress(SaberAction::Advance, 0.4);
                }
                ActionResult::None
            }
            BalestraPhase::Airborne {
                front_ground_y,
                rear_ground_y,
            } => {
                let down = (front_y - front_ground_y).abs() <= BALESTRA_LAND_TOLERANCE
                    && (rear_y - rear_ground_y).abs() <= BALESTRA_LAND_TOLERANCE;
                if down {
                    self.phase = BalestraPhase::Landed { landed_ms: now };
                    return ActionResult::in_progress(SaberAction::Advance, 0.5);
                }
                if now.saturating_sub(self.takeoff_ms) > BALESTRA_MAX_AIRTIME_MS {
                    return self.abort("airborne too long");
                }
                ActionResult::in_progress(SaberAction::Advance, 0.4)
            }
            BalestraPhase::Landed { landed_ms } => {
                if let Some(tracker) = LungeTracker::trigger(&motion) {
                    trace!("Balestra chained into a lunge at {}ms", now);
                    self.phase = BalestraPhase::Lunging(tracker);
                    return ActionResult::in_progress(SaberAction::Lunging, 0.6);
                }
                if now.saturating_sub(landed_ms) > BALESTRA_CHAIN_WINDOW_MS {
                    return self.abort("no lunge after landing");
                }
                ActionResult::None
            }
            BalestraPhase::Lunging(tracker) => match tracker.step(&motion) {
                LungeStep::Moving(progress) => ActionResult::in_progress(
                    SaberAction::Lunging,
                    (0.6 + 0.3 * progress).clamp(0.6, 0.9),
                ),
                LungeStep::Landed => {
                    let (quality, feedback) = grade_lunge(&motion.now);
                    let duration_ms = now.saturating_sub(self.takeoff_ms);
                    debug!("Balestra-lunge completed in {}ms: {:?}", duration_ms, quality);
                    self.reset();
                    ActionResult::Completed {
                        action: SaberAction::BalestraLunge,
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
        self.phase = BalestraPhase::Idle;
        self.takeoff_ms = 0;
    }

    fn in_progress(&self) -> bool {
        self.phase != BalestraPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ActionQuality;
    use crate::testing::{track, PoseBuilder, FRAME_MS};

    fn run(detector: &mut BalestraLungeDetector, frames: &[PoseFrame]) -> Vec<ActionResult> {
        let ctx = DetectContext::default();
        (0..frames.len())
            .map(|i| detector.detect(&frames[i], &frames[..i], &ctx))
            .collect()
    }

    /// Five still frames, two airborne frames moving forward, a landing, then a lunge.
    fn balestra_frames(lift: f32) -> Vec<PoseFrame> {
        let base = PoseBuilder::new(0.4);
        let mut frames = track(&base, &[0.4; 5], 0);
        frames.push(base.at(0.42).jump(lift).build(5 * FRAME_MS));
        frames.push(base.at(0.44).jump(lift).build(6 * FRAME_MS));
        frames.push(base.at(0.45).build(7 * FRAME_MS));
        let rear = base.at(0.45).rear_ankle_x();
        for (i, x) in [0.48, 0.51, 0.54, 0.57].iter().enumerate() {
            frames.push(base.at(*x).plant_rear(rear).build((8 + i as u64) * FRAME_MS));
        }
        let landing = base.front_knee(90.0).rear_knee(170.0).elbow(170.0);
        for hold in 0..2 {
            frames.push(landing.at(0.57).plant_rear(rear).build((12 + hold) * FRAME_MS));
        }
        frames
    }

    #[test]
    fn jump_then_lunge_completes() {
        let mut detector = BalestraLungeDetector::new();
        let results = run(&mut detector, &balestra_frames(0.04));

        assert_eq!(results[5].action(), Some(SaberAction::Advance));
        assert_eq!(results[6].action(), Some(SaberAction::Advance));
        assert_eq!(results[7].action(), Some(SaberAction::Advance));
        assert_eq!(results[8].action(), Some(SaberAction::Lunging));
        assert_eq!(
            results.last(),
            Some(&ActionResult::Completed {
                action: SaberAction::BalestraLunge,
                quality: ActionQuality::Perfect,
                feedback: None,
                duration_ms: 13 * FRAME_MS - 5 * FRAME_MS,
            })
        );
        assert!(!detector.in_progress());
    }

    #[test]
    fn small_hop_is_ignored() {
        let results = run(&mut BalestraLungeDetector::new(), &balestra_frames(0.01));
        assert!(results.iter().all(ActionResult::is_none));
    }

    #[test]
    fn hanging_in_the_air_aborts() {
        let base = PoseBuilder::new(0.4);
        let mut frames = track(&base, &[0.4; 5], 0);
        for i in 0..18u64 {
            frames.push(base.at(0.42 + 0.001 * i as f32).jump(0.05).build((5 + i) * FRAME_MS));
        }
        let mut detector = BalestraLungeDetector::new();
        let results = run(&mut detector, &frames);
        assert_eq!(results[5].action(), Some(SaberAction::Advance));
        assert_eq!(results.last(), Some(&ActionResult::None));
    }

    #[test]
    fn landing_without_lunge_expires() {
        let base = PoseBuilder::new(0.4);
        let mut frames = track(&base, &[0.4; 5], 0);
        frames.push(base.at(0.42).jump(0.04).build(5 * FRAME_MS));
        for i in 0..20u64 {
            frames.push(base.at(0.43).build((6 + i) * FRAME_MS));
        }
        let mut detector = BalestraLungeDetector::new();
        let results = run(&mut detector, &frames);
        assert_eq!(results[6].action(), Some(SaberAction::Advance));
        assert!(results[7..].iter().all(ActionResult::is_none));
        assert!(!detector.in_progress());
    }
}
