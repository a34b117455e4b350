//! Structured telemetry emitted while a session runs
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for one detection session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Creates new UUID-based session IDs.
impl SessionId {
    pub fn new() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One structured telemetry message. `ts` is the frame timestamp in milliseconds.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryPacket<'a> {
    // Frame refused before reaching the detectors
    FrameRejected {
        session_id: SessionId,
        ts: u64,
        reason: &'a str,
    },
    // Stance FSM state change
    StanceTransition {
        session_id: SessionId,
        ts: u64,
        from: &'a str,
        to: &'a str,
        reason: &'a str,
    },
    // Time spent in a stance state, sent when it is left
    StateDuration {
        session_id: SessionId,
        ts: u64,
        state: &'a str,
        duration_ms: u64,
    },
    // A family (or "all") of detectors forced back to idle
    DetectorsReset {
        session_id: SessionId,
        ts: u64,
        scope: &'a str,
    },
    // Result handed back to the host
    ActionEmitted {
        session_id: SessionId,
        ts: u64,
        action: &'a str,
        completed: bool,
        quality: Option<&'a str>,
        duration_ms: Option<u64>,
        feedback: Option<&'a str>,
    },
}

/// Destination for telemetry packets. The engine itself does no I/O.
pub trait TelemetrySink: Send {
    fn write(&mut self, pkt: &TelemetryPacket) -> Result<(), anyhow::Error>;
}

/// Telemetry for one session: its id plus an optional sink.
pub struct TelemetryRun {
    pub session_id: SessionId,
    sink: Option<Box<dyn TelemetrySink>>,
}

impl TelemetryRun {
    /// A run with no sink; packets are dropped.
    pub fn disabled() -> Self {
        TelemetryRun {
            session_id: SessionId::new(),
            sink: None,
        }
    }

    pub fn with_sink(sink: Box<dyn TelemetrySink>) -> Self {
        TelemetryRun {
            session_id: SessionId::new(),
            sink: Some(sink),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Hands a packet to the sink. Failures are logged, never propagated.
    pub fn write(&mut self, pkt: &TelemetryPacket) {
        if let Some(sink) = &mut self.sink {
            if let Err(e) = sink.write(pkt) {
                warn!("Telemetry write failed: {e:#}");
            }
        }
    }
}
