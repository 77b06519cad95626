//! Directive envelopes: instructions for the agent appended after the
//! user-visible part of a synthetic message.

pub const DIRECTIVE_MARKER: &str = "SYSTEM INSTRUCTION:";

const SEPARATOR: &str = "\n\n";

pub fn with_directive(content: &str, instructions: &str) -> String {
    format!("{content}{SEPARATOR}{DIRECTIVE_MARKER} {instructions}")
}

/// Agent-facing text for a study-session start. The agent is asked to reply
/// with `reply` verbatim.
pub fn session_start_directive(content: &str, minutes: u32, subject: &str, motivation: &str) -> String {
    let instructions = format!(
        "This is a study timer request. The timer has already been started automatically for \
         {minutes} minutes. Do not use any tools or functions. Respond with this exact message: \
         \"{motivation}\n\n**Timer Started:** {minutes} minutes for {subject}\""
    );
    with_directive(content, &instructions)
}

pub fn session_complete_directive(completion: &str) -> String {
    with_directive(
        completion,
        "This is an automatic study session completion message. Do not use any tools or \
         functions. Simply acknowledge this completion with a brief encouraging response.",
    )
}

/// The part of a message meant for people. `None` when nothing but a
/// directive remains.
pub fn display_text(text: &str) -> Option<&str> {
    let marker = format!("{SEPARATOR}{DIRECTIVE_MARKER}");
    let visible = match text.find(&marker) {
        Some(index) => &text[..index],
        None if text.trim_start().starts_with(DIRECTIVE_MARKER) => "",
        None => text,
    };
    let visible = visible.trim();
    (!visible.is_empty()).then_some(visible)
}
