// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instruction templates and transcript rendering for summarization requests.

use kontext_core::{Message, SummaryStyle};

const STRUCTURED_PROMPT: &str = r#"You are summarizing a conversation to preserve context efficiently.

Create a concise summary that captures:

1. MAIN TOPIC: What is this conversation about? (1-2 sentences)

2. KEY FACTS: Important information established (bullet points)
   - Include specific details, numbers, decisions
   - Focus on facts that may be referenced later

3. USER CONTEXT: What does the user want to achieve?
   - Their goals or problems
   - Any preferences mentioned

4. CURRENT STATE: Where is the conversation now?
   - What was just discussed
   - What's likely to come next

5. OPEN QUESTIONS: Anything unresolved?

Keep the summary under 400 words while preserving ALL critical information.
Write in third person (e.g., "The user asked about..." not "You asked...")."#;

const CONCISE_PROMPT: &str = "Summarize this conversation in the most concise way possible while preserving all critical facts, decisions, and context. Focus on what's essential for continuing the conversation seamlessly. Keep it under 200 words.";

const RESEARCH_PROMPT: &str = r#"Create a detailed research-oriented summary of this conversation including:
- Main research questions or topics explored
- Key findings, facts, and data points discussed
- Methodologies or approaches mentioned
- Conclusions or insights reached
- Outstanding questions or areas for further exploration

Be thorough and academic in tone. Keep under 500 words."#;

const NARRATIVE_PROMPT: &str = "Summarize this conversation as a coherent narrative that captures the flow of discussion, the user's journey through the topic, and how the conversation evolved. Maintain a natural storytelling tone while preserving all important information. Keep under 400 words.";

/// User prompt appended to the full history when drafting a manual summary.
pub const MANUAL_SUMMARY_PROMPT: &str = "Please provide a concise summary of our conversation so far, highlighting the key points and any important context.";

pub fn instructions(style: SummaryStyle) -> &'static str {
    match style {
        SummaryStyle::Structured => STRUCTURED_PROMPT,
        SummaryStyle::Concise => CONCISE_PROMPT,
        SummaryStyle::Research => RESEARCH_PROMPT,
        SummaryStyle::Narrative => NARRATIVE_PROMPT,
    }
}

/// Flattens messages into `ROLE: content` blocks separated by blank lines.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.to_string().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the two-message request sent to the transport: style instructions
/// as the system message and the wrapped transcript as the user message.
pub fn summary_request(messages: &[Message], style: SummaryStyle) -> Vec<Message> {
    vec![
        Message::system(instructions(style)),
        Message::user(format!(
            "<conversation>\n{}\n</conversation>\n\nCreate the summary now:",
            render_transcript(messages)
        )),
    ]
}
