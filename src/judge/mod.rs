// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Judge evaluation
//!
//! One structured-output model call over the full transcript, parsed against
//! a fixed schema with defaults substituted for missing fields. A failed
//! evaluation never disturbs a previously stored report.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::debate::prompts;
use crate::debate::transcript::Argument;
use crate::error::{Result, RostrumError};
use crate::llm::{CallOutcome, GenerateRequest, ModelClient, TokenUsage};

/// Log message carried by the system entry that stores a judge report
pub const JUDGE_SUMMARY_MESSAGE: &str =
    "The judge has delivered a verdict. Full analysis and scores are on record.";

const MISSING_OVERALL_SUMMARY: &str = "The judge did not provide an overall summary.";

/// One-sentence summary of a completed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    /// 1-based round number
    pub round_number: u32,
    /// The judge's summary of the round
    pub summary: String,
}

/// The four fixed scoring dimensions, each in [0, 100]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreDimensions {
    /// Argument quality, evidence use, logical rigor
    pub content_and_argumentation: f64,
    /// Clarity, persuasiveness, debating technique
    pub expression_and_technique: f64,
    /// Responsiveness and quality of rebuttal
    pub reaction_and_adaptability: f64,
    /// Confidence and overall command
    pub presence: f64,
}

impl ScoreDimensions {
    /// Arithmetic mean of the four dimensions, rounded to one decimal place
    pub fn average(&self) -> f64 {
        let sum = self.content_and_argumentation
            + self.expression_and_technique
            + self.reaction_and_adaptability
            + self.presence;
        (sum / 4.0 * 10.0).round() / 10.0
    }
}

/// A side's dimensions plus the derived average
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleScores {
    /// Per-dimension scores
    pub dimensions: ScoreDimensions,
    /// Mean of the dimensions, one decimal place
    pub average: f64,
}

impl From<ScoreDimensions> for RoleScores {
    fn from(dimensions: ScoreDimensions) -> Self {
        Self {
            average: dimensions.average(),
            dimensions,
        }
    }
}

/// The judge's complete verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeReport {
    /// Per-round summaries, full rounds only
    #[serde(default)]
    pub round_summaries: Vec<RoundSummary>,
    /// Overall assessment of the debate
    pub overall_summary: String,
    /// The affirmative side's scores
    pub pro_scores: RoleScores,
    /// The opposing side's scores
    pub con_scores: RoleScores,
}

// What the model actually returns; everything optional so partial payloads
// never fail the parse.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJudgePayload {
    #[serde(default)]
    round_summaries: Vec<RoundSummary>,
    overall_summary: Option<String>,
    pro_scores: Option<RawRoleScores>,
    con_scores: Option<RawRoleScores>,
}

#[derive(Debug, Deserialize)]
struct RawRoleScores {
    dimensions: Option<ScoreDimensions>,
}

/// Strip an enclosing Markdown code fence from raw model output, if present
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let fence = match Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$") {
        Ok(fence) => fence,
        Err(_) => return trimmed.to_string(),
    };
    match fence.captures(trimmed) {
        Some(captures) => captures
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| trimmed.to_string()),
        None => trimmed.to_string(),
    }
}

/// Parse raw model output into a report, substituting defaults.
///
/// Missing role dimensions default to all-zero; the average is always
/// recomputed from the (possibly defaulted) dimensions, never trusted from
/// the payload.
pub fn parse_judge_payload(raw: &str) -> Result<JudgeReport> {
    let json = strip_code_fence(raw);
    let payload: RawJudgePayload = serde_json::from_str(&json)
        .map_err(|e| RostrumError::JudgeEvaluation(format!("unparsable judge payload: {e}")))?;

    let pro = payload
        .pro_scores
        .and_then(|s| s.dimensions)
        .unwrap_or_default();
    let con = payload
        .con_scores
        .and_then(|s| s.dimensions)
        .unwrap_or_default();

    Ok(JudgeReport {
        round_summaries: payload.round_summaries,
        overall_summary: payload
            .overall_summary
            .unwrap_or_else(|| MISSING_OVERALL_SUMMARY.to_string()),
        pro_scores: pro.into(),
        con_scores: con.into(),
    })
}

/// Run the judge over the full transcript.
///
/// Requires at least one non-system entry. Returns the parsed report and the
/// call's token usage for the caller to fold into its accounting.
pub async fn evaluate(
    client: &dyn ModelClient,
    model: &str,
    credential: &str,
    topic: &str,
    log: &[Argument],
    cancel: &CancellationToken,
) -> Result<(JudgeReport, TokenUsage)> {
    if !log.iter().any(|entry| !entry.speaker.is_system()) {
        return Err(RostrumError::InsufficientTranscript);
    }

    let prompt = prompts::judge_prompt(topic, log);
    let request = GenerateRequest::new(model, prompt).with_json_response();

    let reply = match client.generate(&request, credential, cancel).await {
        Ok(CallOutcome::Completed(reply)) => reply,
        Ok(CallOutcome::Cancelled) => {
            return Err(RostrumError::JudgeEvaluation(
                "evaluation was cancelled".to_string(),
            ))
        }
        Err(e) => return Err(RostrumError::JudgeEvaluation(e.to_string())),
    };

    let mut report = parse_judge_payload(&reply.text)?;

    // A round counts only once both sides have spoken in it
    let pro_turns = log
        .iter()
        .filter(|e| e.speaker == crate::debate::role::Speaker::Pro)
        .count();
    let con_turns = log
        .iter()
        .filter(|e| e.speaker == crate::debate::role::Speaker::Con)
        .count();
    report.round_summaries.truncate(pro_turns.min(con_turns));

    Ok((report, reply.usage))
}
