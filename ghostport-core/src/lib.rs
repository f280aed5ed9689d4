//! # ghostport-core
//!
//! Core library for converting Ghost JSON backups into Hugo content.
//!
//! This crate provides the pipeline stages (slug resolution, HTML to
//! Markdown conversion, front matter synthesis, image bundling, writing and
//! validation) plus the backup reader and configuration that drive them.

pub mod backup;
pub mod classify;
pub mod config;
pub mod convert;
pub mod frontmatter;
pub mod images;
pub mod models;
pub mod pipeline;
pub mod slug;
pub mod text;
pub mod validate;
pub mod writer;

pub use backup::{Backup, BackupError, RawRecord};
pub use config::{Config, ConfigError, ConfigOverrides};
pub use convert::BodyConverter;
pub use frontmatter::{FrontMatterBuilder, FrontmatterError};
pub use images::{ImageIndex, ImageMaterializer};
pub use models::{FrontMatter, Seo};
pub use pipeline::{ExportError, ExportSummary, Exporter, RecordReport, RunContext};
pub use slug::{resolve as resolve_slug, ResolvedSlug, SlugResolutionError};
pub use validate::{quarantine, validate, InvalidReason, Validation};
pub use writer::OutputUnit;
