//! Ghost JSON backup reading.
//!
//! Ghost has shipped two export layouts over the years:
//!
//! - `{ "data": { "posts": [...], "users": [...] } }`
//! - `{ "db": [ { "data": { ... } } ] }`
//!
//! Both are accepted. Relation tables (`posts_tags`, `posts_authors`,
//! `posts_meta`) are folded into the records so the pipeline only ever
//! sees self-contained [`RawRecord`]s.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to read backup file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse backup JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Could not detect Ghost data structure (expected `data.posts` or `db[0].data`)")]
    UnknownLayout,
}

/// A tag attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    Named { name: String },
    Bare(String),
}

impl TagRef {
    pub fn name(&self) -> &str {
        match self {
            TagRef::Named { name } => name.trim(),
            TagRef::Bare(name) => name.trim(),
        }
    }

    /// Ghost internal tags (`#hash-tags`) are never published
    pub fn is_internal(&self) -> bool {
        self.name().starts_with('#')
    }
}

/// One post or page as it appears in the backup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub html: Option<String>,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(rename = "type", default)]
    pub record_type: Option<String>,

    /// Legacy (Ghost 1.x) page flag
    #[serde(default)]
    pub page: Option<bool>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub published_at: Option<String>,

    #[serde(default)]
    pub tags: Vec<TagRef>,

    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub published_by: Option<String>,

    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub author_id: Option<String>,

    #[serde(default)]
    pub custom_excerpt: Option<String>,

    #[serde(default)]
    pub feature_image: Option<String>,

    #[serde(default)]
    pub meta_title: Option<String>,

    #[serde(default)]
    pub meta_description: Option<String>,

    #[serde(default)]
    pub og_image: Option<String>,

    #[serde(default)]
    pub canonical_url: Option<String>,
}

impl RawRecord {
    /// Trimmed title, empty when absent
    pub fn title(&self) -> &str {
        self.title.as_deref().map(str::trim).unwrap_or_default()
    }

    /// The record type string, honoring the legacy `page` flag
    pub fn type_name(&self) -> &str {
        match (&self.record_type, self.page) {
            (Some(t), _) => t.as_str(),
            (None, Some(true)) => "page",
            (None, _) => "post",
        }
    }

    /// Id of the user credited as author
    pub fn author_ref(&self) -> Option<&str> {
        self.published_by
            .as_deref()
            .or(self.author_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Public tag names in their original order
    pub fn tag_names(&self) -> Vec<String> {
        self.tags
            .iter()
            .filter(|t| !t.is_internal() && !t.name().is_empty())
            .map(|t| t.name().to_string())
            .collect()
    }
}

/// A Ghost user (author)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub bio: Option<String>,

    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TagRow {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PostTagRow {
    #[serde(deserialize_with = "string_or_number")]
    post_id: String,
    #[serde(deserialize_with = "string_or_number")]
    tag_id: String,
    #[serde(default)]
    sort_order: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct PostAuthorRow {
    #[serde(deserialize_with = "string_or_number")]
    post_id: String,
    #[serde(deserialize_with = "string_or_number")]
    author_id: String,
    #[serde(default)]
    sort_order: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct PostMetaRow {
    #[serde(deserialize_with = "string_or_number")]
    post_id: String,
    #[serde(default)]
    meta_title: Option<String>,
    #[serde(default)]
    meta_description: Option<String>,
    #[serde(default)]
    og_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BackupData {
    #[serde(default)]
    posts: Vec<RawRecord>,
    #[serde(default)]
    users: Vec<Author>,
    #[serde(default)]
    tags: Vec<TagRow>,
    #[serde(default)]
    posts_tags: Vec<PostTagRow>,
    #[serde(default)]
    posts_authors: Vec<PostAuthorRow>,
    #[serde(default)]
    posts_meta: Vec<PostMetaRow>,
}

/// Parsed backup: records with their relations folded in, plus authors
#[derive(Debug, Default)]
pub struct Backup {
    pub records: Vec<RawRecord>,
    pub authors: HashMap<String, Author>,
}

impl Backup {
    /// Load a backup file from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BackupError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Parse a backup from its JSON text
    pub fn from_json_str(json: &str) -> Result<Self, BackupError> {
        let root: Value = serde_json::from_str(json)?;
        let data = locate_data(&root).ok_or(BackupError::UnknownLayout)?;
        let data: BackupData = serde_json::from_value(data.clone())?;
        Ok(Self::assemble(data))
    }

    /// Author record for a raw record, if any
    pub fn author_for(&self, record: &RawRecord) -> Option<&Author> {
        record.author_ref().and_then(|id| self.authors.get(id))
    }

    fn assemble(data: BackupData) -> Self {
        let tag_names: HashMap<&str, &str> = data
            .tags
            .iter()
            .map(|t| (t.id.as_str(), t.name.as_str()))
            .collect();

        let mut joined_tags: HashMap<&str, Vec<(i64, &str)>> = HashMap::new();
        for row in &data.posts_tags {
            if let Some(name) = tag_names.get(row.tag_id.as_str()) {
                joined_tags
                    .entry(row.post_id.as_str())
                    .or_default()
                    .push((row.sort_order, name));
            }
        }

        let mut first_author: HashMap<&str, (i64, &str)> = HashMap::new();
        for row in &data.posts_authors {
            let entry = first_author
                .entry(row.post_id.as_str())
                .or_insert((row.sort_order, row.author_id.as_str()));
            if row.sort_order < entry.0 {
                *entry = (row.sort_order, row.author_id.as_str());
            }
        }

        let meta: HashMap<&str, &PostMetaRow> = data
            .posts_meta
            .iter()
            .map(|m| (m.post_id.as_str(), m))
            .collect();

        let records = data
            .posts
            .iter()
            .cloned()
            .map(|mut record| {
                if record.tags.is_empty() {
                    if let Some(rows) = joined_tags.get_mut(record.id.as_str()) {
                        rows.sort_by_key(|(order, _)| *order);
                        record.tags = rows
                            .iter()
                            .map(|(_, name)| TagRef::Bare(name.to_string()))
                            .collect();
                    }
                }

                if record.author_ref().is_none() {
                    if let Some((_, author)) = first_author.get(record.id.as_str()) {
                        record.published_by = Some(author.to_string());
                    }
                }

                if let Some(m) = meta.get(record.id.as_str()) {
                    fill_missing(&mut record.meta_title, &m.meta_title);
                    fill_missing(&mut record.meta_description, &m.meta_description);
                    fill_missing(&mut record.og_image, &m.og_image);
                }

                record
            })
            .collect();

        let authors = data
            .users
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();

        Self { records, authors }
    }
}

fn locate_data(root: &Value) -> Option<&Value> {
    if let Some(data) = root.get("data") {
        if data.get("posts").is_some() {
            return Some(data);
        }
    }

    root.get("db")
        .and_then(Value::as_array)
        .and_then(|dbs| dbs.first())
        .and_then(|db| db.get("data"))
}

fn fill_missing(target: &mut Option<String>, source: &Option<String>) {
    let empty = target.as_deref().map_or(true, |s| s.trim().is_empty());
    if empty && source.is_some() {
        *target = source.clone();
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {}",
            other
        ))),
    }
}
