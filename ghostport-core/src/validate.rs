//! Post-write validation and quarantine.
//!
//! Every written file is read back and checked in four steps:
//! read, locate the `---` delimiters, parse the YAML between them, and
//! check that `title` and `slug` are present. Files failing any step are
//! moved (with their bundle folder, if any) into the invalid root.

use crate::frontmatter::split_front_matter;
use crate::writer::OutputUnit;
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Why a written file was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Unreadable,
    MissingFrontMatter,
    MalformedFrontMatter,
    MissingRequiredMetadata,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Unreadable => "unreadable file",
            InvalidReason::MissingFrontMatter => "missing front matter block",
            InvalidReason::MalformedFrontMatter => "malformed front matter",
            InvalidReason::MissingRequiredMetadata => "missing required metadata",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(InvalidReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

const REQUIRED_FIELDS: &[&str] = &["title", "slug"];

/// Validate a written Markdown file
pub fn validate(path: &Path) -> Validation {
    match fs::read_to_string(path) {
        Ok(content) => validate_content(&content),
        Err(err) => {
            tracing::debug!("Cannot read {}: {}", path.display(), err);
            Validation::Invalid(InvalidReason::Unreadable)
        }
    }
}

/// Validate document text
pub fn validate_content(content: &str) -> Validation {
    match check_document(content) {
        Ok(()) => Validation::Valid,
        Err(reason) => Validation::Invalid(reason),
    }
}

fn check_document(content: &str) -> Result<(), InvalidReason> {
    let (yaml, _body) = split_front_matter(content).ok_or(InvalidReason::MissingFrontMatter)?;

    if yaml.trim().is_empty() {
        return Err(InvalidReason::MissingRequiredMetadata);
    }

    let fields = match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(mapping)) => mapping,
        Ok(Value::Null) => return Err(InvalidReason::MissingRequiredMetadata),
        Ok(_) | Err(_) => return Err(InvalidReason::MalformedFrontMatter),
    };

    for key in REQUIRED_FIELDS {
        if !fields.get(*key).is_some_and(has_content) {
            return Err(InvalidReason::MissingRequiredMetadata);
        }
    }
    Ok(())
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) | Value::Bool(_) => true,
        _ => false,
    }
}

/// Move an output unit into `invalid_root`
///
/// Bundles move as a whole folder, single files move alone. An existing
/// entry of the same name is never replaced; the moved entry gets a
/// numeric suffix instead. Returns the new location.
pub fn quarantine(unit: &OutputUnit, invalid_root: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(invalid_root)?;

    let source = unit.root_path();
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no name"))?;
    let target = available_path(invalid_root, name, unit.is_bundle());

    move_path(source, &target)?;
    Ok(target)
}

/// First free `<root>/<name>`, then `name-1`, `name-2`, ...
fn available_path(root: &Path, name: &str, is_dir: bool) -> PathBuf {
    let candidate = root.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match (is_dir, name.rsplit_once('.')) {
        (false, Some((stem, ext))) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    (1..)
        .map(|n| match ext {
            Some(ext) => root.join(format!("{}-{}.{}", stem, n, ext)),
            None => root.join(format!("{}-{}", stem, n)),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

fn move_path(source: &Path, target: &Path) -> io::Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }

    // rename fails across filesystems
    if source.is_dir() {
        copy_dir(source, target)?;
        fs::remove_dir_all(source)
    } else {
        fs::copy(source, target)?;
        fs::remove_file(source)
    }
}

fn copy_dir(source: &Path, target: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::other)?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_valid_document() {
        let doc = "---\ntitle: Hello\nslug: hello\n---\n\nBody\n";
        assert_eq!(validate_content(doc), Validation::Valid);
    }

    #[test]
    fn test_missing_closing_delimiter() {
        let doc = "---\ntitle: Hello\nslug: hello\n\nBody\n";
        assert_eq!(
            validate_content(doc),
            Validation::Invalid(InvalidReason::MissingFrontMatter)
        );
        assert_eq!(InvalidReason::MissingFrontMatter.to_string(), "missing front matter block");
    }

    #[test]
    fn test_missing_opening_delimiter() {
        assert_eq!(
            validate_content("title: Hello\n---\n"),
            Validation::Invalid(InvalidReason::MissingFrontMatter)
        );
    }

    #[test]
    fn test_malformed_yaml() {
        let doc = "---\ntitle: [unclosed\nslug: x\n---\n";
        assert_eq!(
            validate_content(doc),
            Validation::Invalid(InvalidReason::MalformedFrontMatter)
        );

        let doc = "---\n- just\n- a list\n---\n";
        assert_eq!(
            validate_content(doc),
            Validation::Invalid(InvalidReason::MalformedFrontMatter)
        );
    }

    #[test]
    fn test_required_fields() {
        for doc in [
            "---\ntitle: Hello\n---\n",
            "---\ntitle: Hello\nslug: \"  \"\n---\n",
            "---\nslug: hello\ntitle: ~\n---\n",
            "---\n---\n",
        ] {
            assert_eq!(
                validate_content(doc),
                Validation::Invalid(InvalidReason::MissingRequiredMetadata),
                "{doc:?}"
            );
        }
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempdir().unwrap();
        assert_eq!(
            validate(&dir.path().join("missing.md")),
            Validation::Invalid(InvalidReason::Unreadable)
        );
    }

    #[test]
    fn test_quarantine_single_file_never_overwrites() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("posts");
        let invalid = dir.path().join("invalid");
        fs::create_dir_all(&out).unwrap();
        fs::create_dir_all(&invalid).unwrap();
        fs::write(invalid.join("broken.md"), "older").unwrap();

        let file = out.join("broken.md");
        fs::write(&file, "newer").unwrap();
        let moved = quarantine(&OutputUnit::File(file.clone()), &invalid).unwrap();

        assert_eq!(moved, invalid.join("broken-1.md"));
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(invalid.join("broken.md")).unwrap(), "older");
        assert_eq!(fs::read_to_string(moved).unwrap(), "newer");
    }

    #[test]
    fn test_quarantine_bundle_moves_folder() {
        let dir = tempdir().unwrap();
        let bundle = dir.path().join("posts/trip");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("index.md"), "no front matter").unwrap();
        fs::write(bundle.join("photo.jpg"), b"jpg").unwrap();

        let invalid = dir.path().join("invalid");
        fs::create_dir_all(invalid.join("trip")).unwrap();

        let unit = OutputUnit::from_markdown_path(&bundle.join("index.md"));
        let moved = quarantine(&unit, &invalid).unwrap();

        assert_eq!(moved, invalid.join("trip-1"));
        assert!(moved.join("index.md").is_file());
        assert!(moved.join("photo.jpg").is_file());
        assert!(!bundle.exists());
    }
}
