// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Role types for the debate
//!
//! A closed set of tagged variants so every scheduler transition can be
//! matched exhaustively.

use serde::{Deserialize, Serialize};

/// Anyone who can appear in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    /// The affirmative side
    Pro,
    /// The opposing side
    Con,
    /// Synthetic role for informational and judge-summary messages
    System,
}

/// One of the two debating sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Debater {
    /// The affirmative side
    Pro,
    /// The opposing side
    Con,
}

impl Debater {
    /// The side that opens the debate
    pub const FIRST: Debater = Debater::Pro;

    /// The other debating side
    pub fn opponent(self) -> Debater {
        match self {
            Debater::Pro => Debater::Con,
            Debater::Con => Debater::Pro,
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Debater::Pro => "Pro",
            Debater::Con => "Con",
        }
    }
}

impl From<Debater> for Speaker {
    fn from(debater: Debater) -> Self {
        match debater {
            Debater::Pro => Speaker::Pro,
            Debater::Con => Speaker::Con,
        }
    }
}

impl Speaker {
    /// The debating side this speaker is, if it is one
    pub fn as_debater(self) -> Option<Debater> {
        match self {
            Speaker::Pro => Some(Debater::Pro),
            Speaker::Con => Some(Debater::Con),
            Speaker::System => None,
        }
    }

    /// True for the synthetic system role
    pub fn is_system(self) -> bool {
        matches!(self, Speaker::System)
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Speaker::Pro => "Pro",
            Speaker::Con => "Con",
            Speaker::System => "System",
        }
    }
}

/// Debate game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Both sides are model-driven
    #[serde(rename = "AI_VS_AI")]
    AiVsAi,
    /// A human holds one side, the model the other
    #[serde(rename = "HUMAN_VS_AI")]
    HumanVsAi,
}
