//! Export command implementation.

use anyhow::{Context, Result};
use ghostport_core::{Backup, Config, ConfigOverrides, ExportSummary, Exporter};
use ghostport_types::ExportResult;
use std::path::Path;

/// Convert the configured backup into Hugo content and print the run summary
pub fn export_backup(config_path: Option<&Path>, overrides: ConfigOverrides, json: bool) -> Result<()> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    config.apply(overrides);

    let input = config
        .input_path()
        .context("No backup given; pass --input or set `input` in ghostport.yml")?;
    tracing::info!("Loading backup from {:?}", input);
    let backup =
        Backup::from_file(&input).with_context(|| format!("Failed to read backup {:?}", input))?;

    let exporter = Exporter::from_config(config)
        .context("No images directory given; pass --images or set `images` in ghostport.yml")?;
    let summary = exporter.run(&backup).context("Export failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ExportSummary) {
    for report in &summary.records {
        let kind = report.kind.map(|k| k.as_str()).unwrap_or("-");
        let detail = match &report.result {
            ExportResult::Exported { path } => format!("-> {}", path.display()),
            ExportResult::Invalid { path, reason } => format!("-> {} ({})", path.display(), reason),
            ExportResult::SkippedNotApplicable { reason } | ExportResult::Failed { reason } => {
                format!("({})", reason)
            }
        };
        println!("- {:<8} {} {:?} {}", report.result.label(), kind, report.title, detail);
    }

    println!(
        "Export complete: {} exported, {} invalid, {} skipped, {} failed",
        summary.exported, summary.invalid, summary.skipped, summary.failed
    );
}
