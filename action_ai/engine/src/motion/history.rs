//! Rolling pose history owned by the detector manager
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::EngineConfig;
use crate::frame::{FrameError, PoseFrame};
use std::collections::VecDeque;

/// Time-ordered, bounded sequence of accepted frames, oldest first.
/// Storage is kept contiguous so detectors can borrow it as a slice.
pub struct PoseHistory {
    frames: VecDeque<PoseFrame>,
    window_ms: u64,
    max_frames: usize,
    min_interval_ms: u64,
}

impl PoseHistory {
    pub fn new(window_ms: u64, max_frames: usize, min_interval_ms: u64) -> Self {
        PoseHistory {
            frames: VecDeque::with_capacity(max_frames + 1),
            window_ms,
            max_frames: max_frames.max(1),
            min_interval_ms,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.history_window_ms,
            config.history_max_frames,
            config.min_frame_interval_ms,
        )
    }

    /// Checks whether `frame` may be appended. Never mutates the history.
    pub fn admit(&self, frame: &PoseFrame) -> Result<(), FrameError> {
        frame.validate()?;
        if let Some(latest) = self.frames.back() {
            let previous = latest.timestamp_ms();
            let current = frame.timestamp_ms();
            if current < previous.saturating_add(self.min_interval_ms.max(1)) {
                return Err(FrameError::NonMonotonicTimestamp { previous, current });
            }
        }
        Ok(())
    }

    /// Appends a frame and evicts whatever falls outside the retention window.
    pub fn push(&mut self, frame: PoseFrame) {
        let newest = frame.timestamp_ms();
        self.frames.push_back(frame);
        while self.frames.len() > self.max_frames {
            self.frames.pop_front();
        }
        while let Some(oldest) = self.frames.front() {
            if newest.saturating_sub(oldest.timestamp_ms()) > self.window_ms {
                self.frames.pop_front();
            } else {
                break;
            }
        }
        self.frames.make_contiguous();
    }

    /// Every retained frame, oldest first.
    pub fn frames(&self) -> &[PoseFrame] {
        let (head, tail) = self.frames.as_slices();
        debug_assert!(tail.is_empty());
        head
    }

    /// Every retained frame except the newest one.
    pub fn preceding(&self) -> &[PoseFrame] {
        let frames = self.frames();
        &frames[..frames.len().saturating_sub(1)]
    }

    pub fn latest(&self) -> Option<&PoseFrame> {
        self.frames.back()
    }

    /// The frame accepted just before the newest one.
    pub fn previous(&self) -> Option<&PoseFrame> {
        self.preceding().last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
