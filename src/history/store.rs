// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! History store implementation
//!
//! Keeps every persisted debate in one JSON collection keyed by id. The
//! whole collection is rewritten on each mutation, so there is never a
//! partially updated file; the store, not live session state, is the source
//! of truth for anything persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Settings;
use crate::debate::role::{Debater, GameMode};
use crate::debate::session::DebateSession;
use crate::debate::transcript::{Argument, Transcript};
use crate::debate::usage::UsageMeter;
use crate::error::{Result, RostrumError};
use crate::judge::JudgeReport;
use crate::llm::TokenUsage;

/// One persisted debate, exactly as it goes to disk.
///
/// Timestamps serialize as ISO-8601 strings; legacy entries without
/// `currentSpeakerNext` default to the first debating side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session id
    pub id: String,

    /// The motion debated
    pub topic: String,

    /// Game mode
    pub game_mode: GameMode,

    /// When the debate was started
    pub created_at: DateTime<Utc>,

    /// When this snapshot was written
    pub last_saved_at: DateTime<Utc>,

    /// The full transcript
    pub debate_log: Vec<Argument>,

    /// The side the human held, if any
    #[serde(default)]
    pub human_speaker_role: Option<Debater>,

    /// Non-system turns at save time
    pub turn_count: u32,

    /// Cumulative token usage at save time
    #[serde(default)]
    pub usage: TokenUsage,

    /// Judge verdict at save time, if one was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_snapshot: Option<JudgeReport>,

    /// The side due to speak when the debate resumes
    #[serde(default = "default_speaker_next")]
    pub current_speaker_next: Debater,
}

fn default_speaker_next() -> Debater {
    Debater::FIRST
}

impl SessionSnapshot {
    /// Capture a session; the snapshot is a copy, never a reference
    pub fn from_session(session: &DebateSession) -> Self {
        Self {
            id: session.id.clone(),
            topic: session.topic.clone(),
            game_mode: session.mode,
            created_at: session.created_at,
            last_saved_at: Utc::now(),
            debate_log: session.transcript.snapshot(),
            human_speaker_role: session.human_role,
            turn_count: session.turn_count,
            usage: session.usage.cumulative(),
            judge_snapshot: session.judge_snapshot.clone(),
            current_speaker_next: session.speaker_due,
        }
    }

    /// Reconstruct a session from this snapshot.
    ///
    /// Handles are not attached here; the caller recreates whichever the
    /// resumed state needs, credential permitting.
    pub fn into_session(self) -> DebateSession {
        let mut session = DebateSession::new(self.topic, self.game_mode);
        session.id = self.id;
        session.transcript = Transcript::from_entries(self.debate_log);
        session.speaker_due = self.current_speaker_next;
        session.turn_count = self.turn_count;
        session.human_role = self.human_speaker_role;
        session.usage = UsageMeter::from_cumulative(self.usage);
        session.judge_snapshot = self.judge_snapshot;
        session.created_at = self.created_at;
        session.last_saved_at = self.last_saved_at;
        session.discard_handles();
        session
    }
}

/// Durable collection of debate snapshots keyed by id
pub struct HistoryStore {
    index_path: PathBuf,
    entries: Vec<SessionSnapshot>,
}

impl HistoryStore {
    /// Open or create the history store at the default location
    pub fn open() -> Result<Self> {
        Self::open_at(Settings::rostrum_home().join("history.json"))
    }

    /// Open or create a store at an explicit path
    pub fn open_at(index_path: PathBuf) -> Result<Self> {
        let entries = if index_path.exists() {
            let content = std::fs::read_to_string(&index_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut store = Self {
            index_path,
            entries,
        };
        store.sort();
        Ok(store)
    }

    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| b.last_saved_at.cmp(&a.last_saved_at));
    }

    /// Rewrite the whole collection
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.index_path, content)?;
        Ok(())
    }

    /// Insert or replace the snapshot with the same id, then re-sort by
    /// recency
    pub fn upsert(&mut self, snapshot: SessionSnapshot) -> Result<()> {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.id == snapshot.id) {
            *existing = snapshot;
        } else {
            self.entries.insert(0, snapshot);
        }
        self.sort();
        self.save()
    }

    /// Get a snapshot by id
    pub fn get(&self, id: &str) -> Option<&SessionSnapshot> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Load a snapshot by id, erroring when it is unknown
    pub fn load(&self, id: &str) -> Result<SessionSnapshot> {
        self.get(id)
            .cloned()
            .ok_or_else(|| RostrumError::HistoryNotFound(id.to_string()))
    }

    /// Delete a snapshot by id.
    ///
    /// Returns false when the id is absent; the stored collection is left
    /// untouched in that case.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let initial_len = self.entries.len();
        self.entries.retain(|e| e.id != id);

        if self.entries.len() < initial_len {
            self.save()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// All snapshots, most recently saved first
    pub fn list(&self) -> &[SessionSnapshot] {
        &self.entries
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
