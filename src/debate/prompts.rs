// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Prompt builders
//!
//! Pure functions mapping (topic, role, history) to prompt text.

use crate::debate::role::Debater;
use crate::debate::transcript::Argument;

/// Fallback when a rebuttal is requested before the opponent has spoken.
///
/// Only reachable in pathological resumed states.
pub const NO_OPPONENT_ARGUMENT: &str = "The opposing side has not yet spoken.";

/// System instruction binding one debating side to the topic
pub fn system_instruction(side: Debater, topic: &str) -> String {
    let (stance, task) = match side {
        Debater::Pro => ("affirmative", "argue in support of the motion"),
        Debater::Con => ("opposing", "argue against the motion"),
    };
    format!(
        "You are the {stance} debater in a formal debate. The motion is: \"{topic}\". \
         Your task is to {task} with clear, logical reasoning and to rebut the other \
         side's points forcefully. Cite relevant events, data, or accepted facts where \
         they strengthen your case. Keep each statement focused on one core point and \
         under 400 words. Format your answer with Markdown."
    )
}

/// Opening-statement prompt for the first debating side
pub fn opening_prompt(topic: &str) -> String {
    format!(
        "Present your opening statement on the motion: \"{topic}\". Start your argument \
         directly, lay out your position and main points, and keep it under 400 words. \
         Do not preface it with anything like \"Certainly, I will...\"."
    )
}

/// Rebuttal prompt parameterized by the opponent's most recent argument
pub fn rebuttal_prompt(
    topic: &str,
    opponent: Debater,
    opponent_argument: &str,
    speaker: Debater,
) -> String {
    format!(
        "The motion is: \"{topic}\". The {opponent} side's latest argument is:\n\
         --- begin argument ---\n\
         {opponent_argument}\n\
         --- end argument ---\n\
         It is now your turn as {speaker}. Respond to that argument directly, then \
         reinforce your own position with further reasoning or evidence. Keep it under \
         400 words, start your argument directly, and format it with Markdown.",
        opponent = opponent.label(),
        speaker = speaker.label(),
    )
}

/// Informational message shown when a human joins a debate
pub fn human_welcome(human_side: Debater) -> String {
    format!(
        "You are debating as **{}**. Type your opening statement below; the AI will \
         take the other side.",
        human_side.label()
    )
}

/// Structured-output prompt covering the entire transcript for the judge.
///
/// The round-summary instructions cover only full rounds: one turn from each
/// side. The schema in the prompt matches what the parser expects.
pub fn judge_prompt(topic: &str, log: &[Argument]) -> String {
    let mut formatted = String::from("Debate record:\n");
    for (index, entry) in log.iter().enumerate() {
        let mut speaker = entry.speaker.label().to_string();
        if entry.is_user_submitted {
            speaker.push_str(" (human)");
        }
        formatted.push_str(&format!(
            "Statement {} ({}, at {}):\n--- begin statement ---\n{}\n--- end statement ---\n---\n",
            index + 1,
            speaker,
            entry.timestamp.format("%H:%M:%S"),
            entry.content
        ));
    }

    let pro_turns = log
        .iter()
        .filter(|e| e.speaker == crate::debate::role::Speaker::Pro)
        .count();
    let con_turns = log
        .iter()
        .filter(|e| e.speaker == crate::debate::role::Speaker::Con)
        .count();
    let full_rounds = pro_turns.min(con_turns);

    let round_instructions = if full_rounds > 0 {
        let rows: Vec<String> = (1..=full_rounds)
            .map(|round| {
                format!(
                    "    {{ \"roundNumber\": {round}, \"summary\": \"One incisive sentence on \
                     round {round} (Pro's statement {round} versus Con's statement {round}): \
                     name the central clash or the clear advantage.\" }}"
                )
            })
            .collect();
        format!("\"roundSummaries\": [\n{}\n  ],", rows.join(",\n"))
    } else {
        "\"roundSummaries\": [],".to_string()
    };

    format!(
        "You are a rigorous, sharp-eyed debate judge known for critical, unsparing \
         feedback. The motion is: \"{topic}\".\n\n\
         {formatted}\n\
         Evaluate the debate above and return your verdict strictly as the JSON object \
         described below. Do not wrap it in Markdown code fences or add any text outside \
         the JSON structure.\n\n\
         JSON format:\n\
         {{\n  {round_instructions}\n\
         \x20 \"overallSummary\": \"A penetrating overall assessment: each side's \
         strengths and main weaknesses (logical gaps, thin evidence, unanswered \
         points). Provide one even if the debate is still early.\",\n\
         \x20 \"proScores\": {{\n    \"dimensions\": {{\n      \
         \"contentAndArgumentation\": <integer 0-100>,\n      \
         \"expressionAndTechnique\": <integer 0-100>,\n      \
         \"reactionAndAdaptability\": <integer 0-100>,\n      \
         \"presence\": <integer 0-100>\n    }}\n  }},\n\
         \x20 \"conScores\": {{\n    \"dimensions\": {{\n      \
         \"contentAndArgumentation\": <integer 0-100>,\n      \
         \"expressionAndTechnique\": <integer 0-100>,\n      \
         \"reactionAndAdaptability\": <integer 0-100>,\n      \
         \"presence\": <integer 0-100>\n    }}\n  }}\n}}\n\n\
         Score to professional competition standards: high marks only for genuinely \
         strong performances. Provide summaries for exactly {full_rounds} full rounds \
         (a full round is one Pro statement and one Con statement); if there is no full \
         round yet, \"roundSummaries\" must be an empty array. All scores are integers \
         from 0 to 100. The output must be a single valid JSON object."
    )
}
