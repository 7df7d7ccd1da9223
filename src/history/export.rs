// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Markdown export of a persisted debate
//!
//! Renders the transcript with per-side round numbers, cumulative token
//! usage, and the judge verdict, taken from the log's judge entry or from
//! the stored snapshot when the log carries none.

use crate::debate::role::Speaker;
use crate::history::store::SessionSnapshot;
use crate::judge::{JudgeReport, ScoreDimensions};

/// Render one snapshot to a Markdown document
pub fn render_markdown(snapshot: &SessionSnapshot) -> String {
    let mut md = format!("# Debate summary: {}\n\n---\n\n", snapshot.topic);

    md.push_str("## Token usage (whole debate)\n\n");
    md.push_str(&format!("- Prompt tokens: {}\n", snapshot.usage.prompt));
    md.push_str(&format!(
        "- Completion tokens: {}\n",
        snapshot.usage.completion
    ));
    md.push_str(&format!("- Total tokens: {}\n\n---\n\n", snapshot.usage.total));

    md.push_str("## Transcript\n\n---\n\n");

    let mut pro_round = 0;
    let mut con_round = 0;
    let mut judge_in_log = false;

    for entry in &snapshot.debate_log {
        let time = entry.timestamp.format("%H:%M:%S");
        if let Some(report) = &entry.judge_data {
            judge_in_log = true;
            md.push_str(&format!("\n## Judge verdict (recorded {time})\n\n---\n\n"));
            md.push_str(&render_judge_markdown(report));
            md.push_str("\n---\n\n");
        } else if entry.speaker == Speaker::System {
            md.push_str(&format!(
                "**System message ({time}):**\n{}\n\n---\n\n",
                entry.content
            ));
        } else {
            let round = match entry.speaker {
                Speaker::Pro => {
                    pro_round += 1;
                    pro_round
                }
                Speaker::Con => {
                    con_round += 1;
                    con_round
                }
                // Rendered by the branches above
                Speaker::System => continue,
            };
            let mut speaker = format!("{} (round {round})", entry.speaker.label());
            if entry.is_user_submitted {
                speaker.push_str(" (you)");
            }
            md.push_str(&format!("### {speaker} - {time}\n\n{}\n\n---\n\n", entry.content));
        }
    }

    // A stored verdict with no judge entry in the log still gets exported
    if let Some(report) = &snapshot.judge_snapshot {
        if !judge_in_log {
            md.push_str("\n## Judge verdict (latest snapshot)\n\n---\n\n");
            md.push_str(&render_judge_markdown(report));
            md.push_str("\n---\n\n");
        }
    }

    md
}

/// Render a judge report section
pub fn render_judge_markdown(report: &JudgeReport) -> String {
    let mut md = String::new();

    if !report.round_summaries.is_empty() {
        md.push_str("### Round summaries\n\n");
        for round in &report.round_summaries {
            md.push_str(&format!(
                "- **Round {}:** {}\n",
                round.round_number, round.summary
            ));
        }
        md.push_str("\n---\n\n");
    }

    md.push_str(&format!(
        "### Overall summary\n\n{}\n\n---\n\n",
        report.overall_summary
    ));

    md.push_str("### Scores\n\n");
    md.push_str(&render_scores("Pro", &report.pro_scores.dimensions, report.pro_scores.average));
    md.push_str(&render_scores("Con", &report.con_scores.dimensions, report.con_scores.average));
    md
}

fn render_scores(side: &str, dimensions: &ScoreDimensions, average: f64) -> String {
    format!(
        "#### {side} scores:\n\
         - Content and argumentation: {:.1} / 100\n\
         - Expression and technique: {:.1} / 100\n\
         - Reaction and adaptability: {:.1} / 100\n\
         - Presence: {:.1} / 100\n\
         - **Average: {:.1} / 100**\n\n",
        dimensions.content_and_argumentation,
        dimensions.expression_and_technique,
        dimensions.reaction_and_adaptability,
        dimensions.presence,
        average,
    )
}
