//! Progress indicator texts.

/// Shown in the answer slot as soon as the final stream is requested.
pub const PREPARING_RESPONSE: &str = "🤔 Preparing response...";

/// Indicator for tool-calling round `round` (1-based).
pub fn round_indicator(round: u32) -> String {
    match round {
        1 => "🔍 Searching database...".to_string(),
        2 => "🔄 Trying broader search terms...".to_string(),
        3 => "📊 Analyzing product details...".to_string(),
        4 => "🔎 Verifying specifications...".to_string(),
        n => format!("🔧 Processing search (step {n})..."),
    }
}

/// Refined indicator naming what a single tool call is for.
pub fn tool_indicator(round_text: &str, purpose: &str) -> String {
    format!("{round_text} ({purpose})")
}

/// Animation frame `frame` of the "preparing response" indicator.
///
/// Cycles through zero to three trailing dots.
pub fn preparing_frame(frame: usize) -> String {
    format!("🤔 Preparing response{}", ".".repeat(frame % 4))
}
