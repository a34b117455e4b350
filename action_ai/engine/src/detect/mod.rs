//! Per-action detectors and the contract they share
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod action;
pub mod advance_lunge;
pub mod balestra_lunge;
pub mod flunge;
pub mod footwork;
pub mod lunge;
pub mod parry_riposte;
pub(crate) mod quality;
pub mod recovery;

use crate::config::MIN_HISTORY_FRAMES;
use crate::frame::PoseFrame;
use crate::motion::body::{BodyLayout, Skeleton};
use crate::motion::geometry::{horizontal_velocity, velocity};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use action::{ActionQuality, ActionResult, ClipWindow, SaberAction};

/// Groups of detectors the stance engine enables or resets together.
#[derive(Hash, Eq, PartialEq, Clone, Debug, Copy, Serialize, Deserialize)]
pub enum DetectorFamily {
    Footwork,
    Attack,
    Blade,
    Recovery,
}

impl DetectorFamily {
    pub fn of(action: SaberAction) -> Self {
        match action {
            SaberAction::Advance | SaberAction::Retreat => DetectorFamily::Footwork,
            SaberAction::Lunge
            | SaberAction::Lunging
            | SaberAction::AdvanceLunge
            | SaberAction::BalestraLunge
            | SaberAction::Flunge => DetectorFamily::Attack,
            SaberAction::Parry | SaberAction::Riposte => DetectorFamily::Blade,
            // Returning to guard.
            SaberAction::Recovery | SaberAction::EnGarde => DetectorFamily::Recovery,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorFamily::Footwork => "footwork",
            DetectorFamily::Attack => "attack",
            DetectorFamily::Blade => "blade",
            DetectorFamily::Recovery => "recovery",
        }
    }
}

impl fmt::Display for DetectorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only inputs a detector may consult besides the poses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectContext {
    pub layout: BodyLayout,
}

/// A self-contained state machine recognising one action.
///
/// `history` holds the frames that precede `current`, oldest first.
/// Implementations return `ActionResult::None` without touching their state
/// when the history is too short or a frame is incomplete.
pub trait ActionDetector: Send {
    fn target_action(&self) -> SaberAction;

    fn family(&self) -> DetectorFamily {
        DetectorFamily::of(self.target_action())
    }

    fn detect(
        &mut self,
        current: &PoseFrame,
        history: &[PoseFrame],
        ctx: &DetectContext,
    ) -> ActionResult;

    /// Back to idle. Safe to call at any time, any number of times.
    fn reset(&mut self);

    /// Mid-action; traced by the manager after every frame.
    fn in_progress(&self) -> bool;
}

/// The detectors in priority order: combos first, then blade, then simple actions.
pub fn standard_detectors() -> Vec<Box<dyn ActionDetector>> {
    vec![
        Box::new(advance_lunge::AdvanceLungeDetector::new()),
        Box::new(balestra_lunge::BalestraLungeDetector::new()),
        Box::new(flunge::FlungeDetector::new()),
        Box::new(parry_riposte::ParryRiposteDetector::new()),
        Box::new(lunge::LungeDetector::new()),
        Box::new(recovery::RecoveryDetector::new()),
        Box::new(footwork::StepDetector::advance()),
        Box::new(footwork::StepDetector::retreat()),
    ]
}

/// Milliseconds from `earlier` to `later`, zero if they are out of order.
pub(crate) fn elapsed_ms(earlier: &PoseFrame, later: &PoseFrame) -> i64 {
    let dt = later.timestamp_ms().saturating_sub(earlier.timestamp_ms());
    i64::try_from(dt).unwrap_or(i64::MAX)
}

/// Current frame and the one before it, seen through the fencer's layout.
/// `None` when the inputs are not good enough to run a detector.
pub(crate) struct Motion<'a> {
    pub(crate) now: Skeleton<'a>,
    pub(crate) prev: Skeleton<'a>,
    pub(crate) history: &'a [PoseFrame],
    dt_ms: i64,
}

impl<'a> Motion<'a> {
    pub(crate) fn new(
        current: &'a PoseFrame,
        history: &'a [PoseFrame],
        ctx: &DetectContext,
    ) -> Option<Self> {
        if history.len() < MIN_HISTORY_FRAMES || !current.is_complete() {
            return None;
        }
        let previous = history.last().filter(|p| p.is_complete())?;
        Some(Motion {
            now: Skeleton::new(current, ctx.layout),
            prev: Skeleton::new(previous, ctx.layout),
            history,
            dt_ms: elapsed_ms(previous, current),
        })
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.now.timestamp_ms()
    }

    pub(crate) fn layout(&self) -> BodyLayout {
        self.now.layout()
    }

    /// Projects an x displacement onto the forward axis.
    pub(crate) fn forward(&self, dx: f32) -> f32 {
        self.layout().forward(dx)
    }

    pub(crate) fn hip_forward_velocity(&self) -> f32 {
        self.forward(horizontal_velocity(self.prev.hip_mid(), self.now.hip_mid(), self.dt_ms))
    }

    pub(crate) fn hip_speed(&self) -> f32 {
        velocity(self.prev.hip_mid(), self.now.hip_mid(), self.dt_ms)
    }

    pub(crate) fn ankle_forward_velocity(&self) -> f32 {
        self.forward(horizontal_velocity(
            self.prev.front_ankle(),
            self.now.front_ankle(),
            self.dt_ms,
        ))
    }

    pub(crate) fn ankle_speed(&self) -> f32 {
        velocity(self.prev.front_ankle(), self.now.front_ankle(), self.dt_ms)
    }

    pub(crate) fn rear_ankle_speed(&self) -> f32 {
        velocity(self.prev.rear_ankle(), self.now.rear_ankle(), self.dt_ms)
    }

    pub(crate) fn wrist_forward_velocity(&self) -> f32 {
        self.forward(horizontal_velocity(
            self.prev.weapon_wrist(),
            self.now.weapon_wrist(),
            self.dt_ms,
        ))
    }

    /// Skeletons of every history frame, oldest first.
    pub(crate) fn past(&self) -> impl Iterator<Item = Skeleton<'a>> + '_ {
        let layout = self.layout();
        self.history.iter().map(move |f| Skeleton::new(f, layout))
    }
}
