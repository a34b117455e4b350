//! Session recording, kept for later analysis or re-run through a fresh manager
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::detect::ActionResult;
use crate::frame::PoseFrame;
use crate::logic::intent::Intent;
use crate::logic::manager::DetectorManager;
use serde::{Deserialize, Serialize};

/// Frame-timestamped wrapper for any recorded item (result or intent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEntry<T> {
    pub ts_ms: u64,
    pub item: T,
}

/// Timeline of submitted frames, emitted results and executed intents.
/// Serializable; persisting it is left to the host.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReplayRecorder {
    /// Every frame handed to `process`, rejected ones included.
    pub frames: Vec<PoseFrame>,
    pub results: Vec<ReplayEntry<ActionResult>>,
    pub intents: Vec<ReplayEntry<Intent>>,
}

impl ReplayRecorder {
    pub fn record_frame(&mut self, frame: &PoseFrame) {
        self.frames.push(frame.clone());
    }

    /// Records a non-None result returned to the host.
    pub fn record_result(&mut self, ts_ms: u64, result: &ActionResult) {
        self.results.push(ReplayEntry {
            ts_ms,
            item: result.clone(),
        });
    }

    /// Records an intent executed by the manager.
    pub fn record_intent(&mut self, ts_ms: u64, intent: &Intent) {
        self.intents.push(ReplayEntry {
            ts_ms,
            item: intent.clone(),
        });
    }

    /// Feeds the recorded frames through `manager` and returns its non-None results.
    /// With a fresh manager on the same config, this matches `results`.
    pub fn replay(&self, manager: &mut DetectorManager) -> Vec<ReplayEntry<ActionResult>> {
        self.frames
            .iter()
            .filter_map(|frame| {
                let ts_ms = frame.timestamp_ms();
                let item = manager.process(frame.clone());
                (!item.is_none()).then_some(ReplayEntry { ts_ms, item })
            })
            .collect()
    }
}
