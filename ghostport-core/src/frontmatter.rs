//! Front matter derivation, rendering and parsing.
//!
//! Each derived field is described by an ordered list of candidate
//! functions; the first candidate producing a non-empty value wins.

use crate::backup::{Author, RawRecord};
use crate::convert::expand_ghost_url;
use crate::images::scan_body_images;
use crate::models::{FrontMatter, Seo};
use crate::slug::ResolvedSlug;
use crate::text::{self, sanitize_value, DESCRIPTION_LIMIT};
use ghostport_types::{PublishStatus, RecordKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing front matter block")]
    MissingBlock,

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),
}

/// Everything known about one record when its front matter is derived
#[derive(Debug, Clone, Copy)]
pub struct RecordInput<'a> {
    pub record: &'a RawRecord,
    pub kind: RecordKind,
    pub status: PublishStatus,
    pub slug: &'a ResolvedSlug,
    /// Converted Markdown body
    pub body: &'a str,
    pub author: Option<&'a Author>,
}

struct BuildContext<'a> {
    input: &'a RecordInput<'a>,
    site_url: &'a str,
}

type Candidate = fn(&BuildContext<'_>) -> Option<String>;

const TITLE: &[Candidate] = &[record_title, slug_title_case];
const DESCRIPTION: &[Candidate] = &[custom_excerpt, body_first_paragraph];
const FEATURED_IMAGE: &[Candidate] = &[record_feature_image, first_body_image];
const SEO_TITLE: &[Candidate] = &[meta_title];
const SEO_DESCRIPTION: &[Candidate] = &[meta_description];
const SEO_IMAGE: &[Candidate] = &[record_og_image, featured_image_chain];
const DATE: &[Candidate] = &[published_at, created_at];
const LASTMOD: &[Candidate] = &[updated_at, date_chain];

/// Evaluate a fallback chain, sanitizing each candidate before the emptiness check
fn first_non_empty(ctx: &BuildContext<'_>, chain: &[Candidate]) -> Option<String> {
    chain
        .iter()
        .filter_map(|candidate| candidate(ctx))
        .map(|value| sanitize_value(&value))
        .find(|value| !value.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn record_title(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(Some(ctx.input.record.title()))
}

fn slug_title_case(ctx: &BuildContext<'_>) -> Option<String> {
    Some(ctx.input.slug.title_case())
}

fn custom_excerpt(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(ctx.input.record.custom_excerpt.as_deref())
}

fn body_first_paragraph(ctx: &BuildContext<'_>) -> Option<String> {
    text::first_paragraph(ctx.input.body).map(|p| text::truncate_at_sentence(&p, DESCRIPTION_LIMIT))
}

fn record_feature_image(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(ctx.input.record.feature_image.as_deref()).map(|url| expand_ghost_url(&url, ctx.site_url))
}

fn first_body_image(ctx: &BuildContext<'_>) -> Option<String> {
    scan_body_images(ctx.input.body).into_iter().next()
}

fn meta_title(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(ctx.input.record.meta_title.as_deref())
}

fn meta_description(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(ctx.input.record.meta_description.as_deref())
}

fn record_og_image(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(ctx.input.record.og_image.as_deref()).map(|url| expand_ghost_url(&url, ctx.site_url))
}

fn featured_image_chain(ctx: &BuildContext<'_>) -> Option<String> {
    first_non_empty(ctx, FEATURED_IMAGE)
}

fn published_at(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(ctx.input.record.published_at.as_deref())
}

fn created_at(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(ctx.input.record.created_at.as_deref())
}

fn updated_at(ctx: &BuildContext<'_>) -> Option<String> {
    non_empty(ctx.input.record.updated_at.as_deref())
}

fn date_chain(ctx: &BuildContext<'_>) -> Option<String> {
    first_non_empty(ctx, DATE)
}

/// Derives [`FrontMatter`] for records of one run
#[derive(Debug, Clone)]
pub struct FrontMatterBuilder {
    site_url: String,
    default_status: Option<PublishStatus>,
}

impl FrontMatterBuilder {
    pub fn new(site_url: impl Into<String>, default_status: Option<PublishStatus>) -> Self {
        Self {
            site_url: site_url.into(),
            default_status,
        }
    }

    /// Build the front matter for one record
    pub fn build(&self, input: &RecordInput<'_>) -> Result<FrontMatter, FrontmatterError> {
        let ctx = BuildContext {
            input,
            site_url: &self.site_url,
        };

        let title = first_non_empty(&ctx, TITLE).unwrap_or_default();
        if title.is_empty() {
            return Err(FrontmatterError::MissingRequiredField("title".to_string()));
        }
        let slug = input.slug.as_str().to_string();
        if slug.is_empty() {
            return Err(FrontmatterError::MissingRequiredField("slug".to_string()));
        }

        let date = first_non_empty(&ctx, DATE);
        let lastmod = first_non_empty(&ctx, LASTMOD);
        for stamp in [&date, &lastmod].into_iter().flatten() {
            if chrono::DateTime::parse_from_rfc3339(stamp).is_err() {
                tracing::warn!(
                    "Record {} has a non-RFC 3339 timestamp {:?}; copied verbatim",
                    input.record.id,
                    stamp
                );
            }
        }

        let featured_image = first_non_empty(&ctx, FEATURED_IMAGE);
        let seo = Seo {
            title: first_non_empty(&ctx, SEO_TITLE),
            description: first_non_empty(&ctx, SEO_DESCRIPTION),
            image: first_non_empty(&ctx, SEO_IMAGE),
        };

        let tags: Vec<String> = input
            .record
            .tag_names()
            .iter()
            .map(|t| sanitize_value(t))
            .filter(|t| !t.is_empty())
            .collect();
        let categories = tags.first().cloned().into_iter().collect();

        let author = input.author;
        let author_name = author
            .and_then(|a| non_empty(a.name.as_deref()))
            .unwrap_or_else(|| "Unknown".to_string());

        let status = self.default_status.unwrap_or(input.status);

        Ok(FrontMatter {
            title_plain: text::plain_title(&title),
            title,
            date,
            lastmod,
            slug,
            kind: input.kind,
            draft: status.is_draft(),
            status: Some(status),
            author: Some(sanitize_value(&author_name)),
            author_bio: author
                .and_then(|a| non_empty(a.bio.as_deref()))
                .map(|bio| sanitize_value(&bio)),
            author_image: author
                .and_then(|a| non_empty(a.profile_image.as_deref()))
                .map(|url| sanitize_value(&expand_ghost_url(&url, &self.site_url))),
            description: first_non_empty(&ctx, DESCRIPTION),
            cover: featured_image.clone(),
            featured_image,
            reading_time: text::reading_time(&text::plain_text(input.body)),
            canonical_url: non_empty(input.record.canonical_url.as_deref())
                .map(|url| sanitize_value(&expand_ghost_url(&url, &self.site_url))),
            tags,
            categories,
            seo: (!seo.is_empty()).then_some(seo),
        })
    }
}

/// Split a document into its front matter text and body
///
/// The first line must be exactly `---` and a later line must close the
/// block the same way.
pub fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end_matches(['\r', '\n']) != "---" {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let body = &content[offset + line.len()..];
            return Some((&content[yaml_start..offset], body));
        }
        offset += line.len();
    }
    None
}

/// Parse a rendered document back into front matter and body
pub fn parse_front_matter(content: &str) -> Result<(FrontMatter, String), FrontmatterError> {
    let (yaml, body) = split_front_matter(content).ok_or(FrontmatterError::MissingBlock)?;
    let fm: FrontMatter = serde_yaml::from_str(yaml)?;
    if fm.title.trim().is_empty() {
        return Err(FrontmatterError::MissingRequiredField("title".to_string()));
    }
    if fm.slug.trim().is_empty() {
        return Err(FrontmatterError::MissingRequiredField("slug".to_string()));
    }
    Ok((fm, body.trim_start_matches(['\r', '\n']).to_string()))
}

/// Render front matter and body into the final file contents
pub fn render_document(front_matter: &FrontMatter, body: &str) -> Result<String, FrontmatterError> {
    let yaml = serde_yaml::to_string(front_matter)?;
    let body = body.trim();
    if body.is_empty() {
        Ok(format!("---\n{}---\n", yaml))
    } else {
        Ok(format!("---\n{}---\n\n{}\n", yaml, body))
    }
}
