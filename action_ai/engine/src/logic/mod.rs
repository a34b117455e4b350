//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod context;
pub mod fsm;
pub mod intent;
pub mod manager;
pub mod replay;
pub mod stance_states;
pub mod telemetry;
mod timer;
