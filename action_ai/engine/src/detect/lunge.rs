//! Plain lunge, plus the lunge phase shared by the combination attacks
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{
    ARM_FULL_EXTENSION, LUNGE_KNEE_MAX, LUNGE_KNEE_MIN, LUNGE_MAX_DURATION_MS, LUNGE_MIN_DISTANCE,
    LUNGE_REAR_PLANTED_VELOCITY, LUNGE_REVERSE_MARGIN, LUNGE_STOP_VELOCITY, LUNGE_TRIGGER_VELOCITY,
    REAR_LEG_STRAIGHT,
};
use crate::detect::quality::{grade, pick_feedback, FormCheck};
use crate::detect::{
    ActionDetector, ActionQuality, ActionResult, DetectContext, Motion, SaberAction,
};
use crate::frame::PoseFrame;
use crate::motion::body::Skeleton;
use crate::motion::geometry::Band;
use log::{debug, trace};

const KNEE_PAST_FOOT: &str = "Your front knee is past your foot";
const KNEE_TOO_OPEN: &str = "Bend your front knee more";
const REAR_LEG_BENT: &str = "Straighten your back leg";
const ARM_BENT: &str = "Extend your sword arm fully";

/// Where a tracked lunge stands after one more frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LungeStep {
    /// Still travelling; carries progress toward the minimum distance.
    Moving(f32),
    Landed,
    Aborted(&'static str),
}

/// Front-foot travel of one lunge, measured from the frame before take-off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LungeTracker {
    pub(crate) start_ms: u64,
    start_ankle_x: f32,
}

impl LungeTracker {
    /// Whether this frame is a lunge take-off: the front foot shoots forward
    /// while the rear foot stays planted. In a step both feet travel.
    pub(crate) fn takes_off(motion: &Motion) -> bool {
        motion.ankle_forward_velocity() > LUNGE_TRIGGER_VELOCITY
            && motion.rear_ankle_speed() < LUNGE_REAR_PLANTED_VELOCITY
    }

    /// Starts tracking on a take-off.
    pub(crate) fn trigger(motion: &Motion) -> Option<Self> {
        if Self::takes_off(motion) {
            Some(LungeTracker {
                start_ms: motion.prev.timestamp_ms(),
                start_ankle_x: motion.prev.front_ankle().x,
            })
        } else {
            None
        }
    }

    pub(crate) fn step(&self, motion: &Motion) -> LungeStep {
        let elapsed = motion.now_ms().saturating_sub(self.start_ms);
        let displacement = motion.forward(motion.now.front_ankle().x - self.start_ankle_x);
        let stopped = motion.ankle_speed() < LUNGE_STOP_VELOCITY;

        if elapsed > LUNGE_MAX_DURATION_MS {
            LungeStep::Aborted("timed out")
        } else if stopped && displacement >= LUNGE_MIN_DISTANCE {
            LungeStep::Landed
        } else if displacement < LUNGE_REVERSE_MARGIN {
            LungeStep::Aborted("reversed")
        } else if stopped {
            LungeStep::Aborted("stalled short")
        } else {
            LungeStep::Moving((displacement / LUNGE_MIN_DISTANCE).clamp(0.0, 1.0))
        }
    }
}

/// Lunge form on the landing frame: front knee over the foot, rear leg and arm straight.
pub(crate) fn grade_lunge(landing: &Skeleton) -> (ActionQuality, Option<String>) {
    let checks = [
        FormCheck::band(
            landing.front_knee_angle(),
            Band::new(LUNGE_KNEE_MIN, LUNGE_KNEE_MAX),
            KNEE_PAST_FOOT,
            KNEE_TOO_OPEN,
        )
        .primary(),
        FormCheck::within(
            landing.rear_knee_angle(),
            Band::at_least(REAR_LEG_STRAIGHT),
            Some(REAR_LEG_BENT),
        ),
        FormCheck::within(
            landing.weapon_elbow_angle(),
            Band::at_least(ARM_FULL_EXTENSION),
            Some(ARM_BENT),
        ),
    ];
    (grade(&checks), pick_feedback(&checks))
}

pub struct LungeDetector {
    tracker: Option<LungeTracker>,
}

impl LungeDetector {
    pub fn new() -> Self {
        LungeDetector { tracker: None }
    }
}

impl Default for LungeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDetector for LungeDetector {
    fn target_action(&self) -> SaberAction {
        SaberAction::Lunge
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

        let Some(tracker) = self.tracker else {
            return match LungeTracker::trigger(&motion) {
                Some(tracker) => {
                    trace!("Lunge take-off at {}ms", tracker.start_ms);
                    self.tracker = Some(tracker);
                    ActionResult::in_progress(SaberAction::Lunging, 0.5)
                }
                None => ActionResult::None,
            };
        };

        match tracker.step(&motion) {
            LungeStep::Moving(progress) => ActionResult::in_progress(
                SaberAction::Lunging,
                (0.5 + 0.4 * progress).clamp(0.5, 0.9),
            ),
            LungeStep::Landed => {
                self.tracker = None;
                let (quality, feedback) = grade_lunge(&motion.now);
                let duration_ms = motion.now_ms().saturating_sub(tracker.start_ms);
                debug!("Lunge completed in {}ms: {:?}", duration_ms, quality);
                ActionResult::Completed {
                    action: SaberAction::Lunge,
                    quality,
                    feedback,
                    duration_ms,
                }
            }
            LungeStep::Aborted(why) => {
                debug!("Lunge aborted: {}", why);
                self.tracker = None;
                ActionResult::None
            }
        }
    }

    fn reset(&mut self) {
        self.tracker = None;
    }

    fn in_progress(&self) -> bool {
        self.tracker.is_some()
    }
}
