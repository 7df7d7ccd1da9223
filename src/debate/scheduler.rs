// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Turn-taking state machine
//!
//! Pure transition functions over the debate phase. Each function is total
//! over its input state and returns the next phase plus the side effects the
//! driver must perform. No effect runs inline, so the transition logic is
//! testable without a network.

use crate::debate::role::{Debater, GameMode};
use crate::debate::transcript::Transcript;

/// Where the debate currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No active session
    Idle,
    /// Session created, nobody has spoken
    AwaitingOpening,
    /// A model turn is due (or in flight) for a side
    AiTurnPending(Debater),
    /// Waiting for the human to type an argument
    HumanTurnPending,
    /// Session persisted and parked; resumable
    Paused,
    /// Debate concluded
    Ended,
}

impl Phase {
    /// True when the phase belongs to a live session
    pub fn is_active(self) -> bool {
        !matches!(self, Phase::Idle | Phase::Paused | Phase::Ended)
    }
}

/// Which prompt template a model call should use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Opening statement, first turn of the first side only
    Opening,
    /// Rebuttal parameterized by the latest opposing argument
    Rebuttal,
}

/// Side effects a transition asks its driver to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Invoke the model for a side
    CallModel { role: Debater, prompt: PromptKind },
    /// Persist the session snapshot
    Persist,
}

/// Idle → AwaitingOpening on session creation
pub fn initialize(phase: Phase) -> (Phase, Vec<Effect>) {
    match phase {
        Phase::Idle => (Phase::AwaitingOpening, vec![]),
        other => (other, vec![]),
    }
}

/// AwaitingOpening → the first pending turn.
///
/// AI-vs-AI fires the first side's opening call automatically; human-vs-AI
/// waits for the human instead.
pub fn open(phase: Phase, mode: GameMode) -> (Phase, Vec<Effect>) {
    match (phase, mode) {
        (Phase::AwaitingOpening, GameMode::AiVsAi) => (
            Phase::AiTurnPending(Debater::FIRST),
            vec![Effect::CallModel {
                role: Debater::FIRST,
                prompt: PromptKind::Opening,
            }],
        ),
        (Phase::AwaitingOpening, GameMode::HumanVsAi) => (Phase::HumanTurnPending, vec![]),
        (other, _) => (other, vec![]),
    }
}

/// A model call completed: advance the speaker to the other applicable side
pub fn on_call_success(phase: Phase, mode: GameMode) -> (Phase, Vec<Effect>) {
    match (phase, mode) {
        (Phase::AiTurnPending(role), GameMode::AiVsAi) => {
            (Phase::AiTurnPending(role.opponent()), vec![])
        }
        (Phase::AiTurnPending(_), GameMode::HumanVsAi) => (Phase::HumanTurnPending, vec![]),
        (other, _) => (other, vec![]),
    }
}

/// A model call failed or was cancelled.
///
/// Human-vs-AI reverts to the human so the user is never stuck; AI-vs-AI
/// leaves the failed side due, awaiting a manual retry.
pub fn on_call_failure(phase: Phase, mode: GameMode) -> (Phase, Vec<Effect>) {
    match (phase, mode) {
        (Phase::AiTurnPending(_), GameMode::HumanVsAi) => (Phase::HumanTurnPending, vec![]),
        (other, _) => (other, vec![]),
    }
}

/// The human submitted an argument: the AI side replies automatically
pub fn on_human_submit(phase: Phase, mode: GameMode) -> (Phase, Vec<Effect>) {
    match (phase, mode) {
        (Phase::HumanTurnPending, GameMode::HumanVsAi) => {
            let ai_side = Debater::FIRST.opponent();
            (
                Phase::AiTurnPending(ai_side),
                vec![Effect::CallModel {
                    role: ai_side,
                    prompt: PromptKind::Rebuttal,
                }],
            )
        }
        (other, _) => (other, vec![]),
    }
}

/// Park a live session, persisting it first
pub fn pause(phase: Phase) -> (Phase, Vec<Effect>) {
    if phase.is_active() {
        (Phase::Paused, vec![Effect::Persist])
    } else {
        (phase, vec![])
    }
}

/// Any state → Idle, optionally persisting the session on the way out
pub fn reset(phase: Phase, persist: bool) -> (Phase, Vec<Effect>) {
    let effects = if persist && phase != Phase::Idle {
        vec![Effect::Persist]
    } else {
        vec![]
    };
    (Phase::Idle, effects)
}

/// The phase a loaded snapshot resumes into
pub fn phase_for_resume(mode: GameMode, speaker_due: Debater, human_role: Option<Debater>) -> Phase {
    match mode {
        GameMode::HumanVsAi if human_role == Some(speaker_due) => Phase::HumanTurnPending,
        _ => Phase::AiTurnPending(speaker_due),
    }
}

/// Pick the prompt template for a side's next turn.
///
/// Only the very first turn of the first side gets the opening template;
/// everything else is a rebuttal against the latest opposing argument.
pub fn select_prompt(role: Debater, turn_count: u32, transcript: &Transcript) -> PromptKind {
    let opponent_spoke = transcript
        .last_argument_by(role.opponent().into())
        .is_some();
    if role == Debater::FIRST && turn_count == 0 && !opponent_spoke {
        PromptKind::Opening
    } else {
        PromptKind::Rebuttal
    }
}

/// The automatic model call due for the current state, if any.
///
/// Auto-fires happen exactly once per qualifying state entry: the guard
/// checks the busy flag and whether the log already contains the turn the
/// call would produce, so a transition is never re-fired while its call is
/// in flight or already satisfied.
pub fn auto_call_due(
    phase: Phase,
    mode: GameMode,
    transcript: &Transcript,
    turn_count: u32,
    busy: bool,
) -> Option<(Debater, PromptKind)> {
    if busy {
        return None;
    }

    match (phase, mode) {
        // AI-vs-AI: the very first turn fires on its own
        (Phase::AiTurnPending(role), GameMode::AiVsAi) => {
            if role == Debater::FIRST && turn_count == 0 && transcript.debater_turns() == 0 {
                Some((role, PromptKind::Opening))
            } else {
                None
            }
        }
        // Human-vs-AI: the AI replies right after a human submission
        (Phase::AiTurnPending(role), GameMode::HumanVsAi) => {
            let after_human = transcript
                .last_entry()
                .map(|entry| entry.is_user_submitted && entry.speaker.as_debater() != Some(role))
                .unwrap_or(false);
            if after_human {
                Some((role, PromptKind::Rebuttal))
            } else {
                None
            }
        }
        _ => None,
    }
}
