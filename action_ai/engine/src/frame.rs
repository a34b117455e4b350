//! Pose frames delivered by the landmark extractor
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of landmarks in the standard body layout.
pub const LANDMARK_COUNT: usize = 33;

/// Indices into `PoseFrame::landmarks` for the standard 33-point body layout.
pub mod landmark {
    pub const NOSE: usize = 0;
    pub const LEFT_EYE_INNER: usize = 1;
    pub const LEFT_EYE: usize = 2;
    pub const LEFT_EYE_OUTER: usize = 3;
    pub const RIGHT_EYE_INNER: usize = 4;
    pub const RIGHT_EYE: usize = 5;
    pub const RIGHT_EYE_OUTER: usize = 6;
    pub const LEFT_EAR: usize = 7;
    pub const RIGHT_EAR: usize = 8;
    pub const MOUTH_LEFT: usize = 9;
    pub const MOUTH_RIGHT: usize = 10;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_PINKY: usize = 17;
    pub const RIGHT_PINKY: usize = 18;
    pub const LEFT_INDEX: usize = 19;
    pub const RIGHT_INDEX: usize = 20;
    pub const LEFT_THUMB: usize = 21;
    pub const RIGHT_THUMB: usize = 22;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;
    pub const LEFT_HEEL: usize = 29;
    pub const RIGHT_HEEL: usize = 30;
    pub const LEFT_FOOT_INDEX: usize = 31;
    pub const RIGHT_FOOT_INDEX: usize = 32;
}

/// A tracked anatomical point in normalized image space.
/// Origin is the top-left corner and y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y }
    }
}

/// Reasons a frame is refused before it reaches any detector.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("expected {expected} landmarks, got {found}")]
    LandmarkCount { expected: usize, found: usize },

    #[error("timestamp {current}ms does not advance past {previous}ms")]
    NonMonotonicTimestamp { previous: u64, current: u64 },

    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// One pose sample: 33 landmarks plus the capture timestamp.
/// Immutable once built; the landmark vector is only readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    landmarks: Vec<Landmark>,
    timestamp_ms: u64,
}

impl PoseFrame {
    pub fn new(landmarks: Vec<Landmark>, timestamp_ms: u64) -> Self {
        PoseFrame {
            landmarks,
            timestamp_ms,
        }
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Landmark at `index`. Callers check `is_complete` first.
    pub fn point(&self, index: usize) -> Landmark {
        self.landmarks.get(index).copied().unwrap_or_default()
    }

    /// True when the frame carries the full landmark layout.
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() == LANDMARK_COUNT
    }

    /// Structural checks that do not depend on any earlier frame.
    pub fn validate(&self) -> Result<(), FrameError> {
        if !self.is_complete() {
            return Err(FrameError::LandmarkCount {
                expected: LANDMARK_COUNT,
                found: self.landmarks.len(),
            });
        }
        if let Some(index) = self
            .landmarks
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(FrameError::NonFinite { index });
        }
        Ok(())
    }
}
