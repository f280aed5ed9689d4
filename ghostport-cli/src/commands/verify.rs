//! Re-validate exported content and optionally quarantine failures.

use anyhow::{Context, Result};
use ghostport_core::{quarantine, validate, Config, ConfigOverrides, InvalidReason, OutputUnit, Validation};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Serialize)]
struct VerificationSummary {
    checked: usize,
    invalid: Vec<InvalidFile>,
}

#[derive(Serialize)]
struct InvalidFile {
    path: PathBuf,
    reason: InvalidReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    moved_to: Option<PathBuf>,
}

/// Validate every exported Markdown file under the posts and pages roots
pub fn verify_output(
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
    move_invalid: bool,
    json: bool,
) -> Result<()> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    config.apply(overrides);

    let mut files = Vec::new();
    for root in [config.posts_dir(), config.pages_dir()] {
        files.extend(exported_files(&root));
    }

    let invalid_root = config.invalid_dir();
    let mut summary = VerificationSummary {
        checked: files.len(),
        invalid: Vec::new(),
    };

    for path in files {
        let Validation::Invalid(reason) = validate(&path) else {
            continue;
        };

        let moved_to = if move_invalid {
            let unit = OutputUnit::from_markdown_path(&path);
            let moved = quarantine(&unit, &invalid_root)
                .with_context(|| format!("Failed to quarantine {:?}", unit.root_path()))?;
            tracing::warn!("Moved {:?} to {:?}", unit.root_path(), moved);
            Some(moved)
        } else {
            None
        };

        summary.invalid.push(InvalidFile {
            path,
            reason,
            moved_to,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Verification complete: {} files, {} invalid",
            summary.checked,
            summary.invalid.len()
        );
        for file in &summary.invalid {
            match &file.moved_to {
                Some(moved) => println!(
                    "- {}: {} (moved to {})",
                    file.path.display(),
                    file.reason,
                    moved.display()
                ),
                None => println!("- {}: {}", file.path.display(), file.reason),
            }
        }
    }

    Ok(())
}

/// `<root>/<slug>.md` files and `<root>/<slug>/index.md` bundle entries
fn exported_files(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        tracing::warn!("Output folder {:?} does not exist; skipping", root);
        return Vec::new();
    }

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| match e.depth() {
            1 => e.path().extension().is_some_and(|ext| ext == "md"),
            _ => e.file_name() == "index.md",
        })
        .map(|e| e.into_path())
        .collect()
}
