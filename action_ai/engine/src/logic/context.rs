//! Shared, mutable context the stance FSM reads and writes frame by frame
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::{
    EN_GARDE_KNEE_MAX, EN_GARDE_KNEE_MIN, MIN_STANCE_WIDTH, REAR_KNEE_BENT_MAX, STABLE_VELOCITY,
};
use crate::detect::{DetectorFamily, SaberAction};
use crate::logic::stance_states::StanceState;
use serde::{Deserialize, Serialize};

/// Posture summary of one accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub ts_ms: u64,
    /// Hip midpoint speed since the previous frame. None for the first frame.
    pub hip_speed: Option<f32>,
    pub front_knee: f32,
    pub rear_knee: f32,
    pub stance_width: f32,
}

impl PoseSample {
    /// Still, knees bent, feet apart.
    pub fn is_ready(&self) -> bool {
        self.hip_speed.is_some_and(|v| v < STABLE_VELOCITY)
            && (EN_GARDE_KNEE_MIN..=EN_GARDE_KNEE_MAX).contains(&self.front_knee)
            && (EN_GARDE_KNEE_MIN..=REAR_KNEE_BENT_MAX).contains(&self.rear_knee)
            && self.stance_width >= MIN_STANCE_WIDTH
    }

    /// Standing up: both legs straighter than a fencing stance allows.
    pub fn is_upright(&self) -> bool {
        self.front_knee > REAR_KNEE_BENT_MAX && self.rear_knee > REAR_KNEE_BENT_MAX
    }
}

/// Inputs that drive the stance FSM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StanceEvent {
    Pose(PoseSample),
    Report {
        action: SaberAction,
        completed: bool,
        confidence: f32,
    },
    PoseLost,
}

/// Per-session state updated by the stance FSM and the manager.
#[derive(Debug, Clone)]
pub struct StanceContext {
    pub(crate) state: StanceState,
    /// Timestamp of the latest accepted frame (or host tick).
    pub(crate) now_ms: u64,
    pub(crate) entered_ms: u64,
    pub(crate) ready_frames: u32,
    pub(crate) upright_frames: u32,
    /// Attacks are held back until this time after a parry.
    pub(crate) blade_engaged_until: Option<u64>,
    pub(crate) last_lunge_report_ms: u64,
    pub(crate) en_garde_stable_frames: u32,
    pub(crate) stance_break_frames: u32,
}

impl StanceContext {
    pub(crate) fn new(en_garde_stable_frames: u32, stance_break_frames: u32) -> Self {
        StanceContext {
            state: StanceState::Idle,
            now_ms: 0,
            entered_ms: 0,
            ready_frames: 0,
            upright_frames: 0,
            blade_engaged_until: None,
            last_lunge_report_ms: 0,
            en_garde_stable_frames,
            stance_break_frames,
        }
    }

    /// Folds one frame's posture into the streak counters.
    pub(crate) fn observe(&mut self, sample: &PoseSample) {
        self.now_ms = sample.ts_ms;
        self.ready_frames = if sample.is_ready() { self.ready_frames + 1 } else { 0 };
        self.upright_frames = if sample.is_upright() { self.upright_frames + 1 } else { 0 };
        if self.blade_engaged_until.is_some_and(|until| self.now_ms >= until) {
            self.blade_engaged_until = None;
        }
    }

    /// Switches state and starts every streak over.
    pub(crate) fn enter(&mut self, state: StanceState) {
        self.state = state;
        self.entered_ms = self.now_ms;
        self.ready_frames = 0;
        self.upright_frames = 0;
        self.blade_engaged_until = None;
        self.last_lunge_report_ms = self.now_ms;
    }

    pub(crate) fn stable(&self) -> bool {
        self.ready_frames >= self.en_garde_stable_frames
    }

    pub(crate) fn broken(&self) -> bool {
        self.upright_frames >= self.stance_break_frames
    }

    pub fn state(&self) -> StanceState {
        self.state
    }

    pub fn blade_engaged(&self) -> bool {
        self.blade_engaged_until.is_some_and(|until| self.now_ms < until)
    }

    /// Whether detectors of `family` run in the current state.
    pub fn allows(&self, family: DetectorFamily) -> bool {
        if family == DetectorFamily::Attack
            && self.state == StanceState::EnGarde
            && self.blade_engaged()
        {
            return false;
        }
        self.state.eligible_families().contains(&family)
    }
}
