//! Slug resolution and normalization.
//!
//! A slug is built by running the source text through a fixed chain of
//! passes, each a pure `&str -> String` function:
//!
//! 1. [`strip_hex_artifacts`] drops mis-encoded UTF-8 byte sequences
//! 2. [`decompose`] applies NFKD decomposition
//! 3. [`map_digraphs`] turns umlauts into `ae`/`oe`/`ue` and `ß` into `ss`
//! 4. [`filter_charset`] lowercases and keeps only `[a-z0-9-]`
//! 5. [`collapse_hyphens`] squeezes repeated hyphens and trims the edges

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not derive a slug from slug {slug:?} or title {title:?}")]
pub struct SlugResolutionError {
    pub slug: Option<String>,
    pub title: String,
}

/// A non-empty slug made of `[a-z0-9]` groups joined by single hyphens
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedSlug(String);

impl ResolvedSlug {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a numeric disambiguator (`about-me` -> `about-me-2`)
    pub fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}-{}", self.0, n))
    }

    /// Human-readable form used when a record has no title
    ///
    /// ```
    /// use ghostport_core::slug::resolve;
    ///
    /// let slug = resolve(Some("about-me"), "").unwrap();
    /// assert_eq!(slug.title_case(), "About Me");
    /// ```
    pub fn title_case(&self) -> String {
        self.0
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ResolvedSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResolvedSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve the slug for a record from its existing slug, falling back to its title
///
/// # Examples
///
/// ```
/// use ghostport_core::slug::resolve;
///
/// let slug = resolve(
///     Some("f0-9f-93-9a-das-geheime-leben-der-baeume"),
///     "Das geheime Leben der Bäume",
/// )
/// .unwrap();
/// assert_eq!(slug.as_str(), "das-geheime-leben-der-baeume");
///
/// let slug = resolve(None, "Wander dir den Kopf frei! 📸").unwrap();
/// assert_eq!(slug.as_str(), "wander-dir-den-kopf-frei");
/// ```
pub fn resolve(existing_slug: Option<&str>, title: &str) -> Result<ResolvedSlug, SlugResolutionError> {
    let from_slug = existing_slug.map(normalize).unwrap_or_default();
    if !from_slug.is_empty() {
        return Ok(ResolvedSlug(from_slug));
    }

    let from_title = normalize(title);
    if !from_title.is_empty() {
        return Ok(ResolvedSlug(from_title));
    }

    Err(SlugResolutionError {
        slug: existing_slug.map(str::to_string),
        title: title.to_string(),
    })
}

/// Run the full normalization chain; may return an empty string
pub fn normalize(input: &str) -> String {
    let stripped = strip_hex_artifacts(input);
    let decomposed = decompose(&stripped);
    let mapped = map_digraphs(&decomposed);
    let filtered = filter_charset(&mapped);
    collapse_hyphens(&filtered)
}

/// Remove hyphen-joined hex byte tokens left by a broken re-encoding
///
/// Tokens are dropped only where consecutive two-digit hex tokens spell a
/// complete, valid UTF-8 encoding of a non-ASCII character, so `f0-9f-93-9a`
/// (📸) and `c3-a4` (ä) vanish while words made of hex letters such as
/// `ac-dc` or `be-ad` stay.
///
/// ```
/// use ghostport_core::slug::strip_hex_artifacts;
///
/// assert_eq!(strip_hex_artifacts("f0-9f-93-9a-title"), "title");
/// assert_eq!(strip_hex_artifacts("ac-dc-live"), "ac-dc-live");
/// ```
pub fn strip_hex_artifacts(input: &str) -> String {
    let tokens: Vec<&str> = input.split('-').collect();
    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());

    let mut i = 0;
    while i < tokens.len() {
        match encoded_char_len(&tokens[i..]) {
            Some(len) => i += len,
            None => {
                kept.push(tokens[i]);
                i += 1;
            }
        }
    }

    kept.join("-")
}

/// Number of leading tokens that spell one UTF-8 encoded non-ASCII char
fn encoded_char_len(tokens: &[&str]) -> Option<usize> {
    let len = match hex_byte(tokens.first()?)? {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return None,
    };
    let bytes = tokens
        .get(..len)?
        .iter()
        .map(|t| hex_byte(t))
        .collect::<Option<Vec<u8>>>()?;
    std::str::from_utf8(&bytes).ok()?;
    Some(len)
}

fn hex_byte(token: &str) -> Option<u8> {
    if token.len() == 2 && token.bytes().all(|b| b.is_ascii_hexdigit()) {
        u8::from_str_radix(token, 16).ok()
    } else {
        None
    }
}

/// NFKD-decompose so accented letters become base letter + combining mark
pub fn decompose(input: &str) -> String {
    input.nfkd().collect()
}

/// Map umlauts (in decomposed form) and `ß` to their conventional digraphs
///
/// Expects [`decompose`]d input: `ä` arrives as `a` followed by U+0308.
pub fn map_digraphs(input: &str) -> String {
    const DIAERESIS: char = '\u{0308}';

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == 'ß' {
            out.push_str("ss");
            continue;
        }
        if matches!(c, 'a' | 'o' | 'u' | 'A' | 'O' | 'U') && chars.peek() == Some(&DIAERESIS) {
            chars.next();
            out.push(c);
            out.push('e');
            continue;
        }
        out.push(c);
    }
    out
}

/// Lowercase and reduce to `[a-z0-9-]`
///
/// Combining marks, emoji and apostrophes vanish; every other character
/// outside the charset becomes a hyphen.
pub fn filter_charset(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                Some(c)
            } else if is_silent(c) {
                None
            } else {
                Some('-')
            }
        })
        .collect()
}

fn is_silent(c: char) -> bool {
    is_combining_mark(c)
        || matches!(c, '\'' | '\u{2019}' | '\u{200d}' | '\u{fe0e}' | '\u{fe0f}')
        || (c as u32) > 0xFFFF
}

/// Collapse repeated hyphens and trim them from both ends
pub fn collapse_hyphens(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches('-').to_string()
}
