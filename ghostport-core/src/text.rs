//! Plain-text helpers used when deriving front matter fields.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use unicode_segmentation::UnicodeSegmentation;

/// Words per minute used for `reading_time`
pub const WORDS_PER_MINUTE: usize = 200;

/// Target length for generated descriptions
pub const DESCRIPTION_LIMIT: usize = 160;

/// Strip emoji and symbols from a title, keeping letters, digits,
/// whitespace and ASCII punctuation
pub fn plain_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || c.is_ascii_punctuation())
        .collect();
    collapse_whitespace(&kept)
}

/// Flatten markdown into plain text (image alt text excluded)
pub fn plain_text(markdown: &str) -> String {
    let mut out = String::new();
    let mut image_depth = 0usize;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Image { .. }) => image_depth += 1,
            Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) if image_depth == 0 => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => out.push_str("\n\n"),
            _ => {}
        }
    }

    out.trim().to_string()
}

/// Text of the first paragraph that has any visible text
pub fn first_paragraph(markdown: &str) -> Option<String> {
    let mut current: Option<String> = None;
    let mut image_depth = 0usize;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Paragraph) => current = Some(String::new()),
            Event::End(TagEnd::Paragraph) => {
                if let Some(text) = current.take() {
                    let text = collapse_whitespace(&text);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
            Event::Start(Tag::Image { .. }) => image_depth += 1,
            Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) if image_depth == 0 => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(buf) = current.as_mut() {
                    buf.push(' ');
                }
            }
            _ => {}
        }
    }

    None
}

pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}

/// Minutes to read `text`, rounded up, never less than one
pub fn reading_time(text: &str) -> u32 {
    let words = word_count(text);
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Shorten text to at most `limit` characters, preferring a sentence end
///
/// Falls back to the last word boundary (with an ellipsis) when no
/// sentence ends in the second half of the window.
pub fn truncate_at_sentence(text: &str, limit: usize) -> String {
    let text = collapse_whitespace(text);
    if text.chars().count() <= limit {
        return text;
    }

    let cut = text
        .char_indices()
        .nth(limit)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let window = &text[..cut];

    let sentence_end = window
        .char_indices()
        .filter(|&(idx, c)| {
            matches!(c, '.' | '!' | '?')
                && text[idx + c.len_utf8()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace)
        })
        .map(|(idx, c)| idx + c.len_utf8())
        .last();

    if let Some(end) = sentence_end {
        if window[..end].chars().count() >= limit / 2 {
            return window[..end].to_string();
        }
    }

    let at_word = match window.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &window[..idx],
        _ => window,
    };
    format!(
        "{}…",
        at_word.trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
    )
}

/// Make a value safe for a YAML block delimited by `---` lines
///
/// Line breaks and tabs become spaces, other control characters are
/// dropped, and `---` is written as an em dash.
pub fn sanitize_value(value: &str) -> String {
    let flattened: String = value
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    let mut out = collapse_whitespace(&flattened);
    while out.contains("---") {
        out = out.replace("---", "\u{2014}");
    }
    out
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
