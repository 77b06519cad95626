//! Fixed phrase grammar for "I want to study X" style requests.

/// Recognised prefixes, tried in order. The first match wins.
const INTENT_PREFIXES: [&str; 4] = ["i want to study", "let's study", "study", "time to study"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyIntent {
    pub subject: String,
}

/// Matches the trimmed input against the prefixes case-insensitively. The
/// prefix must be followed by whitespace and a non-empty single-line subject.
pub fn parse_study_intent(message: &str) -> Option<StudyIntent> {
    let trimmed = message.trim();
    INTENT_PREFIXES
        .iter()
        .find_map(|prefix| match_prefix(trimmed, prefix))
        .map(|subject| StudyIntent {
            subject: subject.to_string(),
        })
}

fn match_prefix<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &input[prefix.len()..];
    if !rest.starts_with(char::is_whitespace) || rest.contains('\n') {
        return None;
    }
    let subject = rest.trim();
    (!subject.is_empty()).then_some(subject)
}
