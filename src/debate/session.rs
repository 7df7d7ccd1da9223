// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Debate session state
//!
//! A session exclusively owns its transcript and the per-role conversational
//! handles; handles are invalidated on reset or re-initialization and never
//! shared across sessions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::debate::prompts;
use crate::debate::role::{Debater, GameMode};
use crate::debate::transcript::{Argument, Transcript};
use crate::debate::usage::UsageMeter;
use crate::judge::JudgeReport;
use crate::llm::{HistoryEntry, InlineImage};

/// Cancelable conversational context bound to one role and system instruction
#[derive(Debug, Clone)]
pub struct ChatHandle {
    /// The side this handle argues for
    pub role: Debater,

    /// Fixed system instruction for the side
    pub system_instruction: String,

    /// Prior exchanges, in wire order
    pub history: Vec<HistoryEntry>,
}

impl ChatHandle {
    /// Create a fresh handle for a side on a topic
    pub fn new(role: Debater, topic: &str) -> Self {
        Self {
            role,
            system_instruction: prompts::system_instruction(role, topic),
            history: vec![],
        }
    }

    /// Record one completed exchange so later calls carry it as history
    pub fn record_exchange(&mut self, prompt: &str, reply: &str) {
        self.history.push(HistoryEntry::user(prompt));
        self.history.push(HistoryEntry::model(reply));
    }
}

/// All state for one debate
#[derive(Debug, Clone)]
pub struct DebateSession {
    /// Unique session id
    pub id: String,

    /// The motion being debated
    pub topic: String,

    /// Game mode
    pub mode: GameMode,

    /// Ordered log of everything said
    pub transcript: Transcript,

    /// The side due to act next
    pub speaker_due: Debater,

    /// Non-system turns appended since session start
    pub turn_count: u32,

    /// The side held by the human, if any
    pub human_role: Option<Debater>,

    /// Token accounting for the session
    pub usage: UsageMeter,

    /// Most recent completed judge evaluation
    pub judge_snapshot: Option<JudgeReport>,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session was last persisted
    pub last_saved_at: DateTime<Utc>,

    /// Image attached to the opening call, if any
    pub opening_image: Option<InlineImage>,

    pro_handle: Option<ChatHandle>,
    con_handle: Option<ChatHandle>,
}

impl DebateSession {
    /// Create a session for a topic and mode.
    ///
    /// In AI-vs-AI both sides get fresh handles; in human-vs-AI the human
    /// holds the first side, only the AI side gets a handle, and a system
    /// welcome message opens the log.
    pub fn new(topic: impl Into<String>, mode: GameMode) -> Self {
        let topic = topic.into();
        let now = Utc::now();
        let mut session = Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.clone(),
            mode,
            transcript: Transcript::new(),
            speaker_due: Debater::FIRST,
            turn_count: 0,
            human_role: None,
            usage: UsageMeter::new(),
            judge_snapshot: None,
            created_at: now,
            last_saved_at: now,
            opening_image: None,
            pro_handle: None,
            con_handle: None,
        };

        match mode {
            GameMode::AiVsAi => {
                session.attach_handle(ChatHandle::new(Debater::Pro, &topic));
                session.attach_handle(ChatHandle::new(Debater::Con, &topic));
            }
            GameMode::HumanVsAi => {
                session.human_role = Some(Debater::FIRST);
                session.attach_handle(ChatHandle::new(Debater::FIRST.opponent(), &topic));
                session
                    .transcript
                    .append(Argument::system(prompts::human_welcome(Debater::FIRST)));
            }
        }

        session
    }

    /// The handle for a side, if one is attached
    pub fn handle(&self, role: Debater) -> Option<&ChatHandle> {
        match role {
            Debater::Pro => self.pro_handle.as_ref(),
            Debater::Con => self.con_handle.as_ref(),
        }
    }

    /// Mutable handle access for recording exchanges
    pub fn handle_mut(&mut self, role: Debater) -> Option<&mut ChatHandle> {
        match role {
            Debater::Pro => self.pro_handle.as_mut(),
            Debater::Con => self.con_handle.as_mut(),
        }
    }

    /// Attach a handle for its side, replacing any previous one
    pub fn attach_handle(&mut self, handle: ChatHandle) {
        match handle.role {
            Debater::Pro => self.pro_handle = Some(handle),
            Debater::Con => self.con_handle = Some(handle),
        }
    }

    /// Invalidate all handles; required on reset or re-initialization
    pub fn discard_handles(&mut self) {
        self.pro_handle = None;
        self.con_handle = None;
    }

    /// True when the side due to act is the human
    pub fn human_is_due(&self) -> bool {
        self.human_role == Some(self.speaker_due)
    }
}
