//! Shared types for ghostport
//!
//! This crate provides the small value types shared between the core
//! pipeline and the command-line frontend: record kinds, publish status,
//! and per-record export outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of content record in a Ghost backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Post,
    Page,
}

impl RecordKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "post" => Some(RecordKind::Post),
            "page" => Some(RecordKind::Page),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Post => "post",
            RecordKind::Page => "page",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication status of an exported record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Published,
    Draft,
}

impl PublishStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "published" => Some(PublishStatus::Published),
            "draft" => Some(PublishStatus::Draft),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Published => "published",
            PublishStatus::Draft => "draft",
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, PublishStatus::Draft)
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of exporting a single record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExportResult {
    /// Written and validated at `path`
    Exported { path: PathBuf },

    /// Record is not exported (unsupported status or type, excluded draft)
    SkippedNotApplicable { reason: String },

    /// Written, failed validation, and moved to quarantine at `path`
    Invalid { path: PathBuf, reason: String },

    /// A per-record error stopped processing before anything was written
    Failed { reason: String },
}

impl ExportResult {
    /// Short label used in console output
    pub fn label(&self) -> &'static str {
        match self {
            ExportResult::Exported { .. } => "exported",
            ExportResult::SkippedNotApplicable { .. } => "skipped",
            ExportResult::Invalid { .. } => "invalid",
            ExportResult::Failed { .. } => "failed",
        }
    }
}
