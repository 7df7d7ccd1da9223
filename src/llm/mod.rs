// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM module for Rostrum
//!
//! Client abstraction over the generative-language backend.

pub mod client;
pub mod retry;

pub use client::*;
pub use retry::*;
