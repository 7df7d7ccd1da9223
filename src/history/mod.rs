// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! History module for Rostrum
//!
//! Durable storage of finished and paused debates.

pub mod export;
pub mod store;

pub use export::render_markdown;
pub use store::{HistoryStore, SessionSnapshot};
