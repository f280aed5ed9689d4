//! HTML body conversion to Markdown.

use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};
use htmd::HtmlToMarkdown;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use thiserror::Error;

/// Placeholder Ghost stores in place of the site origin
pub const GHOST_URL_PLACEHOLDER: &str = "__GHOST_URL__";

#[derive(Error, Debug)]
#[error("Failed to convert HTML body: {0}")]
pub struct ConversionError(#[from] std::io::Error);

/// HTML to Markdown converter with the post-processing passes applied
pub struct BodyConverter {
    converter: HtmlToMarkdown,
}

impl BodyConverter {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "noscript"])
            .options(Options {
                heading_style: HeadingStyle::Atx,
                code_block_style: CodeBlockStyle::Fenced,
                bullet_list_marker: BulletListMarker::Dash,
                ..Default::default()
            })
            .build();

        Self { converter }
    }

    /// Convert an HTML body to Markdown, filling empty image alt text with `title`
    pub fn convert(&self, html_body: &str, title: &str) -> Result<String, ConversionError> {
        if html_body.trim().is_empty() {
            return Ok(String::new());
        }

        let markdown = self.converter.convert(html_body)?;
        Ok(fill_empty_alt_text(markdown.trim(), title))
    }
}

impl Default for BodyConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `__GHOST_URL__` placeholders with the configured site URL
pub fn expand_ghost_url(text: &str, site_url: &str) -> String {
    text.replace(GHOST_URL_PLACEHOLDER, site_url.trim_end_matches('/'))
}

/// Give every image with blank alt text the supplied alt text
///
/// Images are located with the Markdown parser, so `![](...)` inside code
/// spans or fenced blocks is left alone.
pub fn fill_empty_alt_text(markdown: &str, alt: &str) -> String {
    let alt = escape_alt(alt);
    if alt.is_empty() {
        return markdown.to_string();
    }

    // Byte ranges covering `![` through the closing `]` of blank-alt images
    let mut blanks = Vec::new();
    let mut open: Option<(usize, bool)> = None;
    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Image { .. }) => open = Some((range.start, true)),
            Event::End(TagEnd::Image) => {
                if let Some((start, true)) = open.take() {
                    if let Some(close) = markdown[start..range.end].find(']') {
                        blanks.push(start..start + close + 1);
                    }
                }
            }
            event => {
                if let Some((_, blank)) = open.as_mut() {
                    *blank &= matches!(&event, Event::Text(text) if text.trim().is_empty());
                }
            }
        }
    }

    let mut out = String::with_capacity(markdown.len() + blanks.len() * alt.len());
    let mut last = 0;
    for span in blanks {
        out.push_str(&markdown[last..span.start]);
        out.push_str("![");
        out.push_str(&alt);
        out.push(']');
        last = span.end;
    }
    out.push_str(&markdown[last..]);
    out
}

fn escape_alt(alt: &str) -> String {
    alt.trim()
        .replace('\\', "\\\\")
        .replace('[', "\\[")
        .replace(']', "\\]")
}
