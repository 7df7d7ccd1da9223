// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Transcript of a debate
//!
//! The ordered log of everything said. Entries are immutable once their
//! owning call completes; only an open streaming call may grow the content
//! of the entry it appended, and at most one live entry carries judge data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::debate::role::{Debater, Speaker};
use crate::judge::JudgeReport;

/// A single argument (or system message) in the debate log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    /// Unique identifier
    pub id: Uuid,

    /// Who said it
    pub speaker: Speaker,

    /// What was said
    pub content: String,

    /// When it was said
    pub timestamp: DateTime<Utc>,

    /// True when a human typed it rather than a model generating it
    #[serde(default)]
    pub is_user_submitted: bool,

    /// Judge evaluation carried by a system entry; at most one per transcript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_data: Option<JudgeReport>,
}

impl Argument {
    /// A model-generated argument by a debating side
    pub fn debater(side: Debater, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker: side.into(),
            content: content.into(),
            timestamp: Utc::now(),
            is_user_submitted: false,
            judge_data: None,
        }
    }

    /// A human-submitted argument by a debating side
    pub fn human(side: Debater, content: impl Into<String>) -> Self {
        Self {
            is_user_submitted: true,
            ..Self::debater(side, content)
        }
    }

    /// An informational system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker: Speaker::System,
            content: content.into(),
            timestamp: Utc::now(),
            is_user_submitted: false,
            judge_data: None,
        }
    }

    /// The system entry carrying a completed judge evaluation
    pub fn judge_summary(content: impl Into<String>, report: JudgeReport) -> Self {
        Self {
            judge_data: Some(report),
            ..Self::system(content)
        }
    }
}

/// In-memory ordered log of arguments
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Argument>,
}

impl Transcript {
    /// An empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a transcript from persisted entries
    pub fn from_entries(entries: Vec<Argument>) -> Self {
        Self { entries }
    }

    /// Append an entry and return its id
    pub fn append(&mut self, argument: Argument) -> Uuid {
        let id = argument.id;
        self.entries.push(argument);
        id
    }

    /// Grow the content of an open streaming entry.
    ///
    /// Content only ever grows while the owning stream is open; returns false
    /// when no entry with the id exists.
    pub fn append_content(&mut self, id: Uuid, delta: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.content.push_str(delta);
                true
            }
            None => false,
        }
    }

    /// Drop an uncommitted streaming entry whose call failed or was cancelled
    pub fn discard(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() < before
    }

    /// Replace the judge-bearing system entry.
    ///
    /// Removes any prior entry carrying judge data before appending, so the
    /// transcript never holds more than one.
    pub fn replace_judge_entry(&mut self, argument: Argument) -> Uuid {
        self.entries.retain(|e| e.judge_data.is_none());
        self.append(argument)
    }

    /// Lazily iterate entries matching a predicate
    pub fn filter<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Argument>
    where
        P: Fn(&Argument) -> bool + 'a,
    {
        self.entries.iter().filter(move |e| predicate(e))
    }

    /// All entries, in order
    pub fn entries(&self) -> &[Argument] {
        &self.entries
    }

    /// An immutable copy safe to hand to consumers at any time
    pub fn snapshot(&self) -> Vec<Argument> {
        self.entries.clone()
    }

    /// Number of entries, system messages included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been said
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-system entries
    pub fn debater_turns(&self) -> usize {
        self.entries.iter().filter(|e| !e.speaker.is_system()).count()
    }

    /// The most recent entry, if any
    pub fn last_entry(&self) -> Option<&Argument> {
        self.entries.last()
    }

    /// The most recent entry by a given speaker
    pub fn last_argument_by(&self, speaker: Speaker) -> Option<&Argument> {
        self.entries.iter().rev().find(|e| e.speaker == speaker)
    }

    /// The entry carrying judge data, if one exists
    pub fn judge_entry(&self) -> Option<&Argument> {
        self.entries.iter().find(|e| e.judge_data.is_some())
    }

    /// Completed rounds: one turn from each side makes a round
    pub fn full_rounds(&self) -> usize {
        let pro = self.filter(|e| e.speaker == Speaker::Pro).count();
        let con = self.filter(|e| e.speaker == Speaker::Con).count();
        pro.min(con)
    }
}
