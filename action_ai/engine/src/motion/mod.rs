//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod body;
pub mod geometry;
pub mod history;
