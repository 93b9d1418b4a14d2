//! Prompt rendering for the generation model.

use crate::session::Turn;

/// Fixed safety and style instruction prepended to every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. \
Respond clearly and safely to the user. \
Do NOT include any intent summaries, classifications, or metadata. \
Avoid unsafe, harmful, or offensive content.";

/// Render the system instruction and history into a single prompt.
///
/// Layout:
///
/// ```text
/// <SYSTEM_PROMPT>
///
/// Conversation:
/// user: ...
/// assistant: ...
/// Assistant:
/// ```
pub fn build_prompt(history: &[Turn]) -> String {
    let conversation = history
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.message))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{SYSTEM_PROMPT}\n\nConversation:\n{conversation}\nAssistant:")
}
