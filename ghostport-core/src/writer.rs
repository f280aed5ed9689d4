//! Output layout: single files vs. page bundles.

use crate::frontmatter::{render_document, FrontmatterError};
use crate::models::FrontMatter;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Failed to render front matter: {0}")]
    Render(#[from] FrontmatterError),
}

/// Where a record ended up on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputUnit {
    /// `<root>/<slug>.md`
    File(PathBuf),
    /// `<root>/<slug>/index.md` plus co-located images
    Bundle { dir: PathBuf, index: PathBuf },
}

impl OutputUnit {
    /// Unit for `slug` under `root`
    pub fn for_slug(root: &Path, slug: &str, bundle: bool) -> Self {
        if bundle {
            let dir = root.join(slug);
            let index = dir.join("index.md");
            OutputUnit::Bundle { dir, index }
        } else {
            OutputUnit::File(root.join(format!("{}.md", slug)))
        }
    }

    /// Infer the unit from a written Markdown path
    ///
    /// `index.md` is always treated as a bundle's entry point.
    pub fn from_markdown_path(path: &Path) -> Self {
        let is_index = path.file_name().and_then(|n| n.to_str()) == Some("index.md");
        match path.parent() {
            Some(dir) if is_index && !dir.as_os_str().is_empty() => OutputUnit::Bundle {
                dir: dir.to_path_buf(),
                index: path.to_path_buf(),
            },
            _ => OutputUnit::File(path.to_path_buf()),
        }
    }

    /// The Markdown file of this unit
    pub fn markdown_path(&self) -> &Path {
        match self {
            OutputUnit::File(path) => path,
            OutputUnit::Bundle { index, .. } => index,
        }
    }

    /// The path that moves as one piece (file or bundle folder)
    pub fn root_path(&self) -> &Path {
        match self {
            OutputUnit::File(path) => path,
            OutputUnit::Bundle { dir, .. } => dir,
        }
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self, OutputUnit::Bundle { .. })
    }
}

/// Serialize front matter and body into `unit`
pub fn write_record(
    unit: &OutputUnit,
    front_matter: &FrontMatter,
    body: &str,
) -> Result<(), WriteError> {
    let document = render_document(front_matter, body)?;
    let path = unit.markdown_path();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| WriteError::Io {
            path: parent.to_path_buf(),
            error,
        })?;
    }

    fs::write(path, document).map_err(|error| WriteError::Io {
        path: path.to_path_buf(),
        error,
    })
}
