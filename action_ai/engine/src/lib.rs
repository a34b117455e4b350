//! Sabre footwork and blade action detection over 2D pose landmarks
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod config;
pub mod detect;
pub mod frame;
pub mod logic;
pub mod motion;
#[cfg(test)]
mod testing;

pub use config::{ConfigError, EngineConfig, Facing, Handedness};
pub use detect::{
    standard_detectors, ActionDetector, ActionQuality, ActionResult, ClipWindow, DetectContext,
    DetectorFamily, SaberAction,
};
pub use frame::{FrameError, Landmark, PoseFrame, LANDMARK_COUNT};
pub use logic::manager::DetectorManager;
pub use logic::replay::{ReplayEntry, ReplayRecorder};
pub use logic::stance_states::StanceState;
pub use logic::telemetry::{SessionId, TelemetryPacket, TelemetrySink};
