//! Side effects requested by stance handlers and applied by the manager
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::detect::DetectorFamily;
use crate::logic::context::StanceEvent;
use crate::logic::manager::EngineHost;
use crate::logic::telemetry::TelemetryPacket;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Actions a stance handler can ask for. Handlers never touch detectors or
/// history themselves; they return intents and the bus carries them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    ResetFamily(DetectorFamily), // Resets every detector of one family
    ResetAll,                    // Resets every detector
    ClearHistory,                // Drops all buffered frames
    LogTransition {
        // Logs a stance transition
        from: String,
        to: String,
        triggered_by: Option<StanceEvent>,
        reason: String,
    },
    Chain(Vec<Intent>), // Executes a sequence of intents in order
    NoOp,               // Does nothing (placeholder)
}

/// Dispatches and executes intents against the manager's host data.
pub struct IntentBus;

impl IntentBus {
    /// Applies an intent. Nothing here can fail; sink errors are already swallowed by telemetry.
    pub(crate) fn execute(&self, host: &mut EngineHost, intent: &Intent) {
        match intent {
            // Puts one family of detectors back to idle.
            Intent::ResetFamily(family) => {
                let mut count = 0;
                for detector in host.detectors.iter_mut().filter(|d| d.family() == *family) {
                    detector.reset();
                    count += 1;
                }
                debug!("Reset {} {} detector(s)", count, family);
                let (session_id, ts) = (host.telemetry.session_id.clone(), host.ctx.now_ms);
                host.telemetry.write(&TelemetryPacket::DetectorsReset {
                    session_id,
                    ts,
                    scope: family.as_str(),
                });
            }

            Intent::ResetAll => {
                for detector in host.detectors.iter_mut() {
                    detector.reset();
                }
                debug!("Reset all detectors");
                let (session_id, ts) = (host.telemetry.session_id.clone(), host.ctx.now_ms);
                host.telemetry.write(&TelemetryPacket::DetectorsReset {
                    session_id,
                    ts,
                    scope: "all",
                });
            }

            Intent::ClearHistory => {
                debug!("Clearing {} buffered frame(s)", host.history.len());
                host.history.clear();
            }

            // Executes a sequence of intents recursively.
            Intent::Chain(intents) => {
                for inner in intents {
                    self.execute(host, inner);
                }
            }

            Intent::LogTransition {
                from,
                to,
                triggered_by: _triggered_by,
                reason,
            } => {
                info!("Stance: {} -> {} ({})", from, to, reason);
                let (session_id, ts) = (host.telemetry.session_id.clone(), host.ctx.now_ms);
                host.telemetry.write(&TelemetryPacket::StanceTransition {
                    session_id,
                    ts,
                    from: from.as_str(),
                    to: to.as_str(),
                    reason: reason.as_str(),
                });
            }

            Intent::NoOp => {}
        }
    }
}
