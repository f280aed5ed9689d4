//! Record export pipeline
//!
//! Flow per record:
//!
//! ```text
//! classify → resolve slug → convert body → build front matter
//!          → materialize images → write → validate → (quarantine)
//! ```
//!
//! Records are processed one at a time. The only state shared between
//! records lives in [`RunContext`]: the set of claimed output paths and
//! the running summary.

use crate::backup::{Author, Backup, RawRecord};
use crate::classify::{classify, Classification};
use crate::config::{Config, ConfigError};
use crate::convert::{expand_ghost_url, BodyConverter, ConversionError};
use crate::frontmatter::{FrontMatterBuilder, FrontmatterError, RecordInput};
use crate::images::{ImageIndex, ImageMaterializer};
use crate::slug::{self, ResolvedSlug, SlugResolutionError};
use crate::text::plain_title;
use crate::validate::{self, Validation};
use crate::writer::{write_record, OutputUnit, WriteError};
use ghostport_types::{ExportResult, PublishStatus, RecordKind};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort the whole run
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot create output directory {path}: {error}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

/// Errors caught at the record boundary
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Slug(#[from] SlugResolutionError),

    #[error("Front matter error: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Failed to quarantine {path}: {error}")]
    Quarantine {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

/// Outcome of one record, as reported in the run summary
#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
    #[serde(flatten)]
    pub result: ExportResult,
}

/// Counts and per-record outcomes of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub exported: usize,
    pub invalid: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: Vec<RecordReport>,
}

impl ExportSummary {
    fn push(&mut self, report: RecordReport) {
        match &report.result {
            ExportResult::Exported { .. } => self.exported += 1,
            ExportResult::Invalid { .. } => self.invalid += 1,
            ExportResult::SkippedNotApplicable { .. } => self.skipped += 1,
            ExportResult::Failed { .. } => self.failed += 1,
        }
        self.records.push(report);
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }
}

/// Mutable state of a single run
#[derive(Debug, Default)]
pub struct RunContext {
    used_paths: HashSet<PathBuf>,
    summary: ExportSummary,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `slug` under `root`, appending `-2`, `-3`, ... if it is taken
    pub fn claim_slug(&mut self, root: &Path, slug: ResolvedSlug) -> ResolvedSlug {
        let mut candidate = slug.clone();
        let mut n = 1;
        while !self.used_paths.insert(root.join(candidate.as_str())) {
            n += 1;
            candidate = slug.with_suffix(n);
        }
        if n > 1 {
            tracing::warn!("Slug '{}' already used; writing as '{}'", slug, candidate);
        }
        candidate
    }

    pub fn summary(&self) -> &ExportSummary {
        &self.summary
    }

    pub fn into_summary(self) -> ExportSummary {
        self.summary
    }
}

/// Exports the records of a backup into a Hugo content tree
pub struct Exporter {
    config: Config,
    site_url: String,
    converter: BodyConverter,
    front_matter: FrontMatterBuilder,
    images: ImageIndex,
}

impl Exporter {
    pub fn new(config: Config, images: ImageIndex) -> Self {
        let site_url = config.normalized_site_url();
        let front_matter = FrontMatterBuilder::new(site_url.clone(), config.default_status);
        Self {
            config,
            site_url,
            converter: BodyConverter::new(),
            front_matter,
            images,
        }
    }

    /// Build an exporter, indexing the configured images directory
    pub fn from_config(config: Config) -> Result<Self, ExportError> {
        let images = ImageIndex::build(config.images_dir()?);
        tracing::info!("Indexed {} source images", images.len());
        Ok(Self::new(config, images))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Export every record of `backup`
    ///
    /// Only failing to create the output roots aborts the run; everything
    /// else is recorded per record.
    pub fn run(&self, backup: &Backup) -> Result<ExportSummary, ExportError> {
        for dir in [
            self.config.posts_dir(),
            self.config.pages_dir(),
            self.config.invalid_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|error| ExportError::OutputRoot {
                path: dir.clone(),
                error,
            })?;
        }

        tracing::info!("Exporting {} records", backup.records.len());

        let mut ctx = RunContext::new();
        for record in &backup.records {
            self.export_record(&mut ctx, record, backup.author_for(record));
        }

        let summary = ctx.into_summary();
        tracing::info!(
            "Exported {}, invalid {}, skipped {}, failed {}",
            summary.exported,
            summary.invalid,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    /// Export one record and add its outcome to the run summary
    pub fn export_record(
        &self,
        ctx: &mut RunContext,
        record: &RawRecord,
        author: Option<&Author>,
    ) -> ExportResult {
        let (kind, result) = match classify(record, self.config.skip_drafts) {
            Classification::Skip(reason) => {
                tracing::debug!("Skipping {} ({}): {}", record.id, record.title(), reason);
                (None, ExportResult::SkippedNotApplicable { reason })
            }
            Classification::Export { kind, status } => {
                let result = match self.process(ctx, record, kind, status, author) {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::error!("Failed {} ({}): {}", record.id, record.title(), err);
                        ExportResult::Failed {
                            reason: err.to_string(),
                        }
                    }
                };
                (Some(kind), result)
            }
        };

        ctx.summary.push(RecordReport {
            id: record.id.clone(),
            title: record.title().to_string(),
            kind,
            result: result.clone(),
        });
        result
    }

    fn process(
        &self,
        ctx: &mut RunContext,
        record: &RawRecord,
        kind: RecordKind,
        status: PublishStatus,
        author: Option<&Author>,
    ) -> Result<ExportResult, RecordError> {
        let root = self.config.output_dir(kind);
        let resolved = slug::resolve(record.slug.as_deref(), record.title())?;
        let slug = ctx.claim_slug(&root, resolved);

        let alt = match plain_title(record.title()) {
            alt if alt.trim().is_empty() => slug.title_case(),
            alt => alt,
        };
        let html = expand_ghost_url(record.html.as_deref().unwrap_or_default(), &self.site_url);
        let body = self.converter.convert(&html, alt.trim())?;

        let front_matter = self.front_matter.build(&RecordInput {
            record,
            kind,
            status,
            slug: &slug,
            body: &body,
            author,
        })?;

        let materialized = ImageMaterializer::new(&self.images).materialize(
            &body,
            &front_matter,
            &root.join(slug.as_str()),
        );

        for image in materialized.refs.iter().filter(|r| r.rewritten.is_none()) {
            tracing::debug!("Kept {:?} image reference {}", image.origin, image.original);
        }

        let unit = OutputUnit::for_slug(&root, slug.as_str(), materialized.has_images());
        write_record(&unit, &materialized.front_matter, &materialized.body)?;

        let written = unit.markdown_path().to_path_buf();
        match validate::validate(&written) {
            Validation::Valid => {
                tracing::info!("Exported {} -> {}", record.title(), written.display());
                Ok(ExportResult::Exported { path: written })
            }
            Validation::Invalid(reason) => {
                let moved = validate::quarantine(&unit, &self.config.invalid_dir()).map_err(
                    |error| RecordError::Quarantine {
                        path: unit.root_path().to_path_buf(),
                        error,
                    },
                )?;
                tracing::warn!(
                    "Invalid output for {} ({}); moved to {}",
                    record.title(),
                    reason,
                    moved.display()
                );
                Ok(ExportResult::Invalid {
                    path: moved,
                    reason: reason.to_string(),
                })
            }
        }
    }
}
