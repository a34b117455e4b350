//! Detection thresholds and runtime configuration
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use thiserror::Error;

// The thresholds below are tuned biomechanical values. Changing them is not recommended.

pub(crate) const MIN_HISTORY_FRAMES: usize = 5;

// En garde posture.
pub(crate) const EN_GARDE_KNEE_MIN: f32 = 80.0;
pub(crate) const EN_GARDE_KNEE_MAX: f32 = 140.0;
pub(crate) const GOOD_KNEE_MIN: f32 = 90.0;
pub(crate) const GOOD_KNEE_MAX: f32 = 120.0;
pub(crate) const STABLE_VELOCITY: f32 = 0.05; // hip midpoint, units per second
pub(crate) const REAR_KNEE_BENT_MAX: f32 = 160.0;
pub(crate) const MIN_STANCE_WIDTH: f32 = 0.08;

// Advance / retreat.
pub(crate) const STEP_MOVEMENT_THRESHOLD: f32 = 0.02; // units per second
pub(crate) const STEP_MIN_DISTANCE: f32 = 0.05;
pub(crate) const STEP_MAX_DURATION_MS: u64 = 800;
pub(crate) const STEP_REVERSE_MARGIN: f32 = -0.02;
pub(crate) const STEP_DISTANCE_MARGIN: f32 = 1.5;
pub(crate) const STEP_FAST_DURATION_MS: u64 = 500;
pub(crate) const STEP_WIDTH_RETENTION: f32 = 0.7;

// Lunge and the lunge phase of combos.
pub(crate) const LUNGE_TRIGGER_VELOCITY: f32 = 0.5; // front ankle, forward
pub(crate) const LUNGE_REAR_PLANTED_VELOCITY: f32 = 0.15; // rear ankle stays put
pub(crate) const LUNGE_STOP_VELOCITY: f32 = 0.1;
pub(crate) const LUNGE_MIN_DISTANCE: f32 = 0.10;
pub(crate) const LUNGE_MAX_DURATION_MS: u64 = 1000;
pub(crate) const LUNGE_REVERSE_MARGIN: f32 = -0.03;
pub(crate) const LUNGE_KNEE_MIN: f32 = 80.0;
pub(crate) const LUNGE_KNEE_MAX: f32 = 100.0;
pub(crate) const ARM_EXTENDED_ANGLE: f32 = 150.0;
pub(crate) const ARM_FULL_EXTENSION: f32 = 165.0;
pub(crate) const REAR_LEG_STRAIGHT: f32 = 165.0;

// Advance-lunge.
pub(crate) const COMBO_STEP_MIN_DISTANCE: f32 = 0.04;
pub(crate) const COMBO_CHAIN_WINDOW_MS: u64 = 600;
pub(crate) const COMBO_MAX_DURATION_MS: u64 = 1600;

// Balestra-lunge.
pub(crate) const BALESTRA_MIN_LIFT: f32 = 0.03;
pub(crate) const BALESTRA_LAND_TOLERANCE: f32 = 0.015;
pub(crate) const BALESTRA_MAX_AIRTIME_MS: u64 = 500;
pub(crate) const BALESTRA_CHAIN_WINDOW_MS: u64 = 500;

// Flunge.
pub(crate) const FLUNGE_LAUNCH_VELOCITY: f32 = 0.8; // hip midpoint, forward
pub(crate) const FLUNGE_STOP_VELOCITY: f32 = 0.15;
pub(crate) const FLUNGE_MIN_DISTANCE: f32 = 0.15;
pub(crate) const FLUNGE_MAX_DURATION_MS: u64 = 1200;
pub(crate) const FLUNGE_ARM_WAIT_MS: u64 = 1000;
pub(crate) const FLUNGE_EXTENSION_TOLERANCE_MS: u64 = 200;
pub(crate) const FLUNGE_MIN_LEAN: f32 = 0.03;

// Parry-riposte.
pub(crate) const PARRY_ELBOW_MAX: f32 = 130.0;
pub(crate) const PARRY_MIN_TRAVEL: f32 = 0.04;
pub(crate) const PARRY_HOLD_FRAMES: u32 = 2;
pub(crate) const QUINTE_HEAD_MARGIN: f32 = 0.02;
pub(crate) const RIPOSTE_EXTENSION_ANGLE: f32 = 150.0;
pub(crate) const RIPOSTE_WRIST_VELOCITY: f32 = 0.4;
pub(crate) const RIPOSTE_WINDOW_MS: u64 = 700;
pub(crate) const RIPOSTE_FAST_MS: u64 = 300;
pub(crate) const RIPOSTE_REACH: f32 = 0.1;

// Recovery to en garde.
pub(crate) const RECOVERY_MOVEMENT_THRESHOLD: f32 = 0.05;
pub(crate) const RECOVERY_MIN_DISTANCE: f32 = 0.06;
pub(crate) const RECOVERY_MAX_DURATION_MS: u64 = 1000;
pub(crate) const RECOVERY_FAST_MS: u64 = 600;
pub(crate) const UPRIGHT_TOLERANCE: f32 = 0.05;

// Stance engine.
pub(crate) const LUNGING_STALE_MS: u64 = 1200;

/// The longest duration cap of any detector. History must retain at least this much.
pub(crate) const LONGEST_DETECTOR_CAP_MS: u64 = COMBO_MAX_DURATION_MS;

/// Which hand holds the sabre. The lead leg is on the same side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Right,
    Left,
}

/// Direction the fencer faces in the image (after any mirroring by the camera).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Right,
    Left,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("history window of {window_ms}ms is shorter than the longest cap ({required_ms}ms)")]
    HistoryTooShort { window_ms: u64, required_ms: u64 },
    #[error("history must keep at least {required} frames, got {found}")]
    HistoryTooSmall { required: usize, found: usize },
    #[error("en_garde_stable_frames must be at least 1")]
    NoStableFrames,
}

/// Runtime knobs supplied by the host. Missing YAML keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub handedness: Handedness,
    pub facing: Facing,
    /// Retention of the pose history, measured on frame timestamps.
    pub history_window_ms: u64,
    pub history_max_frames: usize,
    /// Minimum advance of a timestamp over the previous accepted frame.
    pub min_frame_interval_ms: u64,
    /// Without a valid frame for this long the stance engine drops to idle.
    pub pose_lost_timeout_ms: u64,
    pub en_garde_stable_frames: u32,
    /// Consecutive upright frames that end the en garde context.
    pub stance_break_frames: u32,
    /// Lead time added before a completed action when a clip is requested.
    pub clip_prebuffer_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            handedness: Handedness::Right,
            facing: Facing::Right,
            history_window_ms: 2000, // 60 frames at 30Hz
            history_max_frames: 120,
            min_frame_interval_ms: 1,
            pose_lost_timeout_ms: 1000,
            en_garde_stable_frames: 5,
            stance_break_frames: 15,
            clip_prebuffer_ms: 3000,
        }
    }
}

impl EngineConfig {
    /// Parses a YAML document. Keys left out keep their default value.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, anyhow::Error> {
        let config: EngineConfig = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_window_ms < LONGEST_DETECTOR_CAP_MS {
            return Err(ConfigError::HistoryTooShort {
                window_ms: self.history_window_ms,
                required_ms: LONGEST_DETECTOR_CAP_MS,
            });
        }
        if self.history_max_frames <= MIN_HISTORY_FRAMES {
            return Err(ConfigError::HistoryTooSmall {
                required: MIN_HISTORY_FRAMES + 1,
                found: self.history_max_frames,
            });
        }
        if self.en_garde_stable_frames == 0 {
            return Err(ConfigError::NoStableFrames);
        }
        Ok(())
    }
}
