//! Utterance validation and title derivation.

use shopchat_types::chat::DEFAULT_TITLE;
use shopchat_types::error::ChatError;

/// Validate an inbound utterance and return the text to store.
///
/// Blank input and input longer than `max_chars` characters are rejected.
/// Length is measured on the raw input; the returned text has trailing
/// whitespace removed.
pub fn validate_utterance(text: &str, max_chars: usize) -> Result<&str, ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::Validation("Please enter a message.".to_string()));
    }
    if text.chars().count() > max_chars {
        return Err(ChatError::Validation(format!(
            "Message too long (max {} characters).",
            group_thousands(max_chars)
        )));
    }
    Ok(text.trim_end())
}

/// Derive a conversation title from its first user message.
///
/// Keeps at most `max_chars` characters of the trimmed text and appends
/// `"..."` when it had to cut. Pure function of its inputs.
pub fn derive_title(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
