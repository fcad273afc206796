//! # Markdown Module
//!
//! Flattens markdown job descriptions into plain text before they are sent to
//! the LLM, so the prompt spends its budget on words rather than markup.

use pulldown_cmark::{ Event, Parser, TagEnd };

/// Converts markdown to plain text, one block per line.
///
/// # Arguments
///
/// * `markdown` - The raw markdown text, typically a scraped job description.
///
/// # Returns
///
/// The text content with block boundaries turned into newlines.
pub fn to_plain_text(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, pulldown_cmark::Options::all());
    let mut text = String::new();

    for event in parser {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            | Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::TableRow) => {
                text.push('\n');
            }
            Event::End(TagEnd::TableCell) => text.push(' '),
            _ => {}
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncates `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
