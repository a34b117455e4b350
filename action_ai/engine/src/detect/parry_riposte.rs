//! Parry in one of the sabre lines, then the riposte
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{
    ARM_FULL_EXTENSION, PARRY_ELBOW_MAX, PARRY_HOLD_FRAMES, PARRY_MIN_TRAVEL, QUINTE_HEAD_MARGIN,
    RIPOSTE_EXTENSION_ANGLE, RIPOSTE_FAST_MS, RIPOSTE_REACH, RIPOSTE_WINDOW_MS,
    RIPOSTE_WRIST_VELOCITY,
};
use crate::detect::quality::{grade, pick_feedback, FormCheck};
use crate::detect::{ActionDetector, ActionResult, DetectContext, Motion, SaberAction};
use crate::frame::{Landmark, PoseFrame};
use crate::motion::body::Skeleton;
use crate::motion::geometry::{distance, Band};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

const ARM_BENT: &str = "Extend your arm fully on the riposte";
const TOO_SLOW: &str = "Riposte faster after the parry";
const SHORT_REACH: &str = "Aim the riposte at your opponent";

/// Sabre parry lines the detector recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParryZone {
    /// Head parry: blade held above the head.
    Quinte,
    /// Outside line, weapon side.
    Tierce,
    /// Inside line.
    Quarte,
}

/// Line the sword hand is guarding, if the arm is bent enough to be parrying.
pub fn classify_zone(skeleton: &Skeleton) -> Option<ParryZone> {
    if skeleton.weapon_elbow_angle() > PARRY_ELBOW_MAX {
        return None;
    }
    let wrist = skeleton.weapon_wrist();
    if wrist.y < skeleton.nose().y - QUINTE_HEAD_MARGIN {
        return Some(ParryZone::Quinte);
    }
    let shoulders = skeleton.shoulder_mid();
    if wrist.y < shoulders.y || wrist.y > skeleton.hip_mid().y {
        return None;
    }
    let across = skeleton.weapon_shoulder().x - skeleton.off_shoulder().x;
    let weapon_side = if across.abs() > 0.01 {
        across.signum()
    } else {
        skeleton.layout().forward
    };
    if (wrist.x - shoulders.x) * weapon_side > 0.0 {
        Some(ParryZone::Tierce)
    } else {
        Some(ParryZone::Quarte)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BladePhase {
    Idle,
    Parrying {
        zone: ParryZone,
        frames: u32,
    },
    Parried {
        zone: ParryZone,
        parried_ms: u64,
    },
}

pub struct ParryRiposteDetector {
    phase: BladePhase,
    start_ms: u64,
}

impl ParryRiposteDetector {
    pub fn new() -> Self {
        ParryRiposteDetector {
            phase: BladePhase::Idle,
            start_ms: 0,
        }
    }

    fn abort(&mut self, why: &str) -> ActionResult {
        debug!("Parry-riposte aborted: {}", why);
        self.reset();
        ActionResult::None
    }
}

impl Default for ParryRiposteDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn wrist_offset(skeleton: &Skeleton) -> Landmark {
    let wrist = skeleton.weapon_wrist();
    let shoulder = skeleton.weapon_shoulder();
    Landmark::new(wrist.x - shoulder.x, wrist.y - shoulder.y)
}

/// How far the sword hand moved, relative to its shoulder, from where it rested.
/// Body translation cancels out, so footwork alone never reads as a parry.
fn hand_travel(motion: &Motion) -> f32 {
    let (mut x, mut y, mut n) = (0.0, 0.0, 0usize);
    for skeleton in motion.past() {
        let offset = wrist_offset(&skeleton);
        x += offset.x;
        y += offset.y;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    distance(
        Landmark::new(x / n as f32, y / n as f32),
        wrist_offset(&motion.now),
    )
}

impl ActionDetector for ParryRiposteDetector {
    fn target_action(&self) -> SaberAction {
        SaberAction::Riposte
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
        let zone = classify_zone(&motion.now);

        match self.phase {
            BladePhase::Idle => match zone {
                Some(zone) if hand_travel(&motion) >= PARRY_MIN_TRAVEL => {
                    trace!("Parry in {:?} at {}ms", zone, now);
                    self.start_ms = now;
                    self.phase = BladePhase::Parrying { zone, frames: 1 };
                    ActionResult::in_progress(SaberAction::Parry, 0.4)
                }
                _ => ActionResult::None,
            },
            BladePhase::Parrying { zone: held, frames } => {
                if zone != Some(held) {
                    return self.abort("left the parry line");
                }
                let frames = frames + 1;
                if frames >= PARRY_HOLD_FRAMES {
                    self.phase = BladePhase::Parried {
                        zone: held,
                        parried_ms: now,
                    };
                    ActionResult::in_progress(SaberAction::Parry, 0.7)
                } else {
                    self.phase = BladePhase::Parrying { zone: held, frames };
                    ActionResult::in_progress(SaberAction::Parry, 0.4)
                }
            }
            BladePhase::Parried { zone: held, parried_ms } => {
                let delay_ms = now.saturating_sub(parried_ms);
                let extended = motion.now.weapon_elbow_angle() >= RIPOSTE_EXTENSION_ANGLE;
                if extended && motion.wrist_forward_velocity() > RIPOSTE_WRIST_VELOCITY {
                    let reach = motion
                        .forward(motion.now.weapon_wrist().x - motion.now.weapon_shoulder().x);
                    let checks = [
                        FormCheck::within(
                            motion.now.weapon_elbow_angle(),
                            Band::at_least(ARM_FULL_EXTENSION),
                            Some(ARM_BENT),
                        )
                        .primary(),
                        FormCheck::within(
                            delay_ms as f32,
                            Band::at_most(RIPOSTE_FAST_MS as f32),
                            Some(TOO_SLOW),
                        ),
                        FormCheck::within(reach, Band::at_least(RIPOSTE_REACH), Some(SHORT_REACH)),
                    ];
                    let quality = grade(&checks);
                    let duration_ms = now.saturating_sub(self.start_ms);
                    debug!(
                        "Riposte from {:?} after {}ms: {:?}",
                        held, delay_ms, quality
                    );
                    self.reset();
                    return ActionResult::Completed {
                        action: SaberAction::Riposte,
                        quality,
                        feedback: pick_feedback(&checks),
                        duration_ms,
                    };
                }
                if delay_ms > RIPOSTE_WINDOW_MS {
                    return self.abort("no riposte");
                }
                ActionResult::in_progress(SaberAction::Parry, 0.7)
            }
        }
    }

    fn reset(&mut self) {
        self.phase = BladePhase::Idle;
        self.start_ms = 0;
    }

    fn in_progress(&self) -> bool {
        self.phase != BladePhase::Idle
    }
}
