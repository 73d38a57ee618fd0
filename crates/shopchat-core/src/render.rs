//! Markdown to HTML rendering for finished answers.

use pulldown_cmark::{html, Event, Options, Parser};

/// Render model markdown as HTML.
///
/// Tables, strikethrough and task lists are enabled. Raw HTML in the input
/// is emitted as escaped text.
pub fn render_markdown(text: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
