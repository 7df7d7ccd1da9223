// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Token usage accounting
//!
//! Tracks the most recent call's counts and running totals across a session.

use crate::llm::TokenUsage;

/// Aggregates per-call and cumulative token counts
#[derive(Debug, Clone, Default)]
pub struct UsageMeter {
    last: TokenUsage,
    cumulative: TokenUsage,
}

impl UsageMeter {
    /// A fresh meter with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a meter from persisted totals
    pub fn from_cumulative(cumulative: TokenUsage) -> Self {
        Self {
            last: TokenUsage::default(),
            cumulative,
        }
    }

    /// Record one call: replaces the last-call counters and adds them into
    /// the running totals.
    pub fn record_call(&mut self, usage: TokenUsage) {
        self.last = usage;
        self.cumulative.prompt += usage.prompt;
        self.cumulative.completion += usage.completion;
        self.cumulative.total += usage.total;
    }

    /// Zero the last-call counters without touching the totals.
    ///
    /// Used after a human submission, which consumes no API tokens.
    pub fn clear_last(&mut self) {
        self.last = TokenUsage::default();
    }

    /// Counters for the most recent call
    pub fn last(&self) -> TokenUsage {
        self.last
    }

    /// Running totals since session start
    pub fn cumulative(&self) -> TokenUsage {
        self.cumulative
    }

    /// Full reset; only valid on session reset
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u32, completion: u32, total: u32) -> TokenUsage {
        TokenUsage {
            prompt,
            completion,
            total,
        }
    }

    #[test]
    fn test_record_call_replaces_last_and_accumulates() {
        let mut meter = UsageMeter::new();
        meter.record_call(usage(10, 20, 30));
        meter.record_call(usage(1, 2, 3));

        assert_eq!(meter.last(), usage(1, 2, 3));
        assert_eq!(meter.cumulative(), usage(11, 22, 33));
    }

    #[test]
    fn test_clear_last_keeps_totals() {
        let mut meter = UsageMeter::new();
        meter.record_call(usage(10, 20, 30));
        meter.clear_last();

        assert_eq!(meter.last(), TokenUsage::default());
        assert_eq!(meter.cumulative(), usage(10, 20, 30));
    }

    #[test]
    fn test_zero_usage_is_additive() {
        let mut meter = UsageMeter::new();
        meter.record_call(usage(10, 20, 30));
        // Absent metadata defaults to zero and must not disturb totals
        meter.record_call(TokenUsage::default());

        assert_eq!(meter.cumulative(), usage(10, 20, 30));
        assert_eq!(meter.last(), TokenUsage::default());
    }

    #[test]
    fn test_from_cumulative_restores_totals() {
        let meter = UsageMeter::from_cumulative(usage(100, 200, 300));
        assert_eq!(meter.cumulative(), usage(100, 200, 300));
        assert_eq!(meter.last(), TokenUsage::default());
    }

    #[test]
    fn test_reset() {
        let mut meter = UsageMeter::from_cumulative(usage(100, 200, 300));
        meter.reset();
        assert_eq!(meter.cumulative(), TokenUsage::default());
    }
}
