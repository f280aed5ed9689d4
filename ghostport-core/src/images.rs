//! Image discovery, copying and reference rewriting.
//!
//! Images referenced by a record (in its Markdown body or its image-bearing
//! front matter fields) are looked up under the source images root, copied
//! next to the record's `index.md`, and every reference is rewritten to
//! `./<filename>` so the bundle is self-contained.

use crate::models::FrontMatter;
use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, Tag};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Path segment Ghost serves uploaded images from
const CONTENT_IMAGES: &str = "/content/images/";

#[derive(Error, Debug)]
#[error("Failed to copy image {source_path:?} to {dest:?}: {error}")]
pub struct ImageCopyError {
    pub source_path: PathBuf,
    pub dest: PathBuf,
    #[source]
    pub error: std::io::Error,
}

static SIZE_VARIANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^size/w\d+(?:h\d+)?/").unwrap());

/// Image URLs referenced with Markdown image syntax, in document order
///
/// Code spans and code blocks are not scanned.
pub fn scan_body_images(markdown: &str) -> Vec<String> {
    Parser::new(markdown)
        .filter_map(|event| match event {
            Event::Start(Tag::Image { dest_url, .. }) => Some(dest_url.to_string()),
            _ => None,
        })
        .collect()
}

/// Point image and link destinations listed in `rewrites` at their new targets
fn rewrite_destinations(markdown: &str, rewrites: &HashMap<String, String>) -> String {
    let mut edits: Vec<(Range<usize>, String)> = Parser::new(markdown)
        .into_offset_iter()
        .filter_map(|(event, range)| {
            let dest = match event {
                Event::Start(Tag::Image { dest_url, .. } | Tag::Link { dest_url, .. }) => dest_url,
                _ => return None,
            };
            let new = rewrites.get(&*dest)?;
            destination_edit(markdown, range, &dest, new)
        })
        .collect();
    edits.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(markdown.len());
    let mut last = 0;
    for (span, replacement) in edits {
        if span.start < last {
            continue;
        }
        out.push_str(&markdown[last..span.start]);
        out.push_str(&replacement);
        last = span.end;
    }
    out.push_str(&markdown[last..]);
    out
}

/// Source span of an inline destination inside `element`, with its replacement
fn destination_edit(
    markdown: &str,
    element: Range<usize>,
    dest: &str,
    new: &str,
) -> Option<(Range<usize>, String)> {
    let source = markdown.get(element.clone())?;
    let open = source.rfind("](")? + 2;
    let rest = &source[open..];
    let trimmed = rest.trim_start();
    let mut start = element.start + open + (rest.len() - trimmed.len());

    let angled = trimmed.starts_with('<');
    let target = if angled {
        start += 1;
        &trimmed[1..]
    } else {
        trimmed
    };
    if !target.starts_with(dest) {
        return None;
    }

    let replacement = if !angled && new.contains(char::is_whitespace) {
        format!("<{}>", new)
    } else {
        new.to_string()
    };
    Some((start..start + dest.len(), replacement))
}

/// Where an image reference was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefOrigin {
    Body,
    FrontMatter,
}

/// One image reference and, once copied, its bundle-relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub original: String,
    pub origin: RefOrigin,
    pub rewritten: Option<String>,
}

/// Filename index over the source images root
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    root: PathBuf,
    by_name: HashMap<String, Vec<PathBuf>>,
}

impl ImageIndex {
    /// Walk `root` and index every file by its filename
    pub fn build<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut by_name: HashMap<String, Vec<PathBuf>> = HashMap::new();

        if !root.is_dir() {
            tracing::warn!("Images directory {:?} not found; images will not be copied", root);
            return Self { root, by_name };
        }

        for entry in WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if let Ok(rel) = entry.path().strip_prefix(&root) {
                let name = entry.file_name().to_string_lossy().to_string();
                by_name.entry(name).or_default().push(rel.to_path_buf());
            }
        }

        tracing::debug!("Indexed {} image names under {:?}", by_name.len(), root);
        Self { root, by_name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Resolve a reference to a source file under the root
    ///
    /// The path embedded in the URL is tried first (after `/content/images/`
    /// when present, with Ghost's `size/wNNN/` variants removed), then the
    /// bare filename.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let path = url_path(reference)?;

        for candidate in embedded_paths(&path) {
            let full = self.root.join(&candidate);
            if full.is_file() {
                return Some(full);
            }
        }

        let name = path.rsplit('/').next().filter(|n| !n.is_empty())?;
        let matches = self.by_name.get(name)?;
        let best = matches
            .iter()
            .find(|rel| path.ends_with(&rel.to_string_lossy().replace('\\', "/")))
            .or_else(|| matches.first())?;
        Some(self.root.join(best))
    }
}

/// Path portion of a reference: scheme, host, query and fragment removed
fn url_path(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("data:") {
        return None;
    }

    let without_origin = match reference.find("://") {
        Some(idx) => {
            let rest = &reference[idx + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("")
        }
        None if reference.starts_with("//") => {
            let rest = &reference[2..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("")
        }
        None => reference,
    };

    let path = without_origin
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_string();
    (!path.is_empty()).then_some(path)
}

/// Relative paths under the images root that a URL path may point to
fn embedded_paths(path: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(idx) = path.find(CONTENT_IMAGES) {
        let rel = &path[idx + CONTENT_IMAGES.len()..];
        let rel = SIZE_VARIANT.replace(rel, "");
        candidates.push(PathBuf::from(rel.into_owned()));
    }

    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    if !trimmed.is_empty() {
        candidates.push(PathBuf::from(trimmed));
    }

    candidates
        .into_iter()
        .filter(|p| p.components().all(|c| matches!(c, Component::Normal(_))))
        .collect()
}

/// Result of materializing one record's images
#[derive(Debug, Clone)]
pub struct Materialized {
    pub body: String,
    pub front_matter: FrontMatter,
    pub refs: Vec<ImageRef>,
    /// Destination paths of copied files; empty when nothing was copied
    pub copied: Vec<PathBuf>,
}

impl Materialized {
    pub fn has_images(&self) -> bool {
        !self.copied.is_empty()
    }
}

/// Copies referenced images into record bundles
pub struct ImageMaterializer<'a> {
    index: &'a ImageIndex,
}

impl<'a> ImageMaterializer<'a> {
    pub fn new(index: &'a ImageIndex) -> Self {
        Self { index }
    }

    /// Copy every resolvable image into `output_record_dir` and rewrite references
    ///
    /// The directory is only created once a file is actually copied.
    pub fn materialize(
        &self,
        body: &str,
        front_matter: &FrontMatter,
        output_record_dir: &Path,
    ) -> Materialized {
        let mut refs: Vec<ImageRef> = scan_body_images(body)
            .into_iter()
            .map(|original| ImageRef {
                original,
                origin: RefOrigin::Body,
                rewritten: None,
            })
            .chain(front_matter.image_fields().into_iter().map(|original| ImageRef {
                original: original.to_string(),
                origin: RefOrigin::FrontMatter,
                rewritten: None,
            }))
            .collect();

        let mut rewrites: HashMap<String, String> = HashMap::new();
        let mut copied_sources: HashMap<PathBuf, String> = HashMap::new();
        let mut taken_names: HashSet<String> = HashSet::new();
        let mut copied = Vec::new();
        let mut copy_failed = false;

        for image_ref in refs.iter_mut() {
            if let Some(existing) = rewrites.get(&image_ref.original) {
                image_ref.rewritten = Some(existing.clone());
                continue;
            }

            let Some(source) = self.index.resolve(&image_ref.original) else {
                tracing::debug!("Leaving unresolved image reference {}", image_ref.original);
                continue;
            };

            let file_name = match copied_sources.get(&source) {
                Some(name) => name.clone(),
                None => {
                    let name = unique_name(&source, &taken_names);
                    let dest = output_record_dir.join(&name);
                    if let Err(err) = copy_image(&source, &dest) {
                        tracing::warn!("{}", err);
                        copy_failed = true;
                        continue;
                    }
                    tracing::info!("   Copied image: {}", name);
                    taken_names.insert(name.clone());
                    copied_sources.insert(source.clone(), name.clone());
                    copied.push(dest);
                    name
                }
            };

            let relative = format!("./{}", file_name);
            rewrites.insert(image_ref.original.clone(), relative.clone());
            image_ref.rewritten = Some(relative);
        }

        if copied.is_empty() && copy_failed {
            // Only removes the directory if the failed copy left it empty
            let _ = fs::remove_dir(output_record_dir);
        }

        if rewrites.is_empty() {
            return Materialized {
                body: body.to_string(),
                front_matter: front_matter.clone(),
                refs,
                copied,
            };
        }

        let body = rewrite_destinations(body, &rewrites);

        let mut front_matter = front_matter.clone();
        for field in front_matter.image_fields_mut() {
            if let Some(new) = rewrites.get(field.as_str()) {
                *field = new.clone();
            }
        }

        Materialized {
            body,
            front_matter,
            refs,
            copied,
        }
    }
}

/// Destination filename for `source`, suffixed when the name is taken
fn unique_name(source: &Path, taken: &HashSet<String>) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    if !taken.contains(&name) {
        return name;
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| format!("{}-{}{}", stem, n, ext))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(name)
}

fn copy_image(source: &Path, dest: &Path) -> Result<(), ImageCopyError> {
    let wrap = |error| ImageCopyError {
        source_path: source.to_path_buf(),
        dest: dest.to_path_buf(),
        error,
    };
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::copy(source, dest).map_err(wrap)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostport_types::RecordKind;
    use tempfile::tempdir;

    fn front_matter(featured: Option<&str>) -> FrontMatter {
        FrontMatter {
            title: "Photos".into(),
            title_plain: "Photos".into(),
            date: None,
            lastmod: None,
            slug: "photos".into(),
            kind: RecordKind::Post,
            draft: false,
            status: None,
            author: None,
            author_bio: None,
            author_image: None,
            description: None,
            featured_image: featured.map(str::to_string),
            cover: featured.map(str::to_string),
            reading_time: 1,
            canonical_url: None,
            tags: vec![],
            categories: vec![],
            seo: None,
        }
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_scan_body_images() {
        let md = "![a](one.jpg) text ![](<two words.png>) ![t](three.gif \"Title\")\n[link](not-image.jpg) ![\\[x\\]](four.webp)";
        assert_eq!(
            scan_body_images(md),
            vec!["one.jpg", "two words.png", "three.gif", "four.webp"]
        );
    }

    #[test]
    fn test_scan_skips_code() {
        let md = "Inline `![a](in-span.png)` code\n\n```\n![b](in-fence.png)\n```\n\n    ![c](indented.png)\n\n![d](real.png)";
        assert_eq!(scan_body_images(md), vec!["real.png"]);
    }

    #[test]
    fn test_rewrite_leaves_code_alone() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(src.path(), "2024/03/photo.jpg", "jpeg");

        let index = ImageIndex::build(src.path());
        let record_dir = out.path().join("docs");
        let url = "https://cdn.example/2024/03/photo.jpg";
        let body = format!("Embed with `![x]({url})`:\n\n```md\n![x]({url})\n```\n\n![x]({url})");

        let result =
            ImageMaterializer::new(&index).materialize(&body, &front_matter(None), &record_dir);

        assert_eq!(
            result.body,
            format!("Embed with `![x]({url})`:\n\n```md\n![x]({url})\n```\n\n![x](./photo.jpg)")
        );
        assert_eq!(result.refs.len(), 1);
    }

    #[test]
    fn test_rewrite_wraps_names_with_spaces() {
        let mut rewrites = HashMap::new();
        rewrites.insert("/content/images/a b.png".to_string(), "./a b.png".to_string());
        rewrites.insert("/content/images/c.png".to_string(), "./c d.png".to_string());

        let md = "![x](</content/images/a b.png>) ![y](/content/images/c.png \"Title\")";
        assert_eq!(
            rewrite_destinations(md, &rewrites),
            "![x](<./a b.png>) ![y](<./c d.png> \"Title\")"
        );
    }

    #[test]
    fn test_url_path() {
        assert_eq!(
            url_path("https://cdn.example/2024/03/photo.jpg?w=600#top").as_deref(),
            Some("/2024/03/photo.jpg")
        );
        assert_eq!(url_path("//cdn.example/a.png").as_deref(), Some("/a.png"));
        assert_eq!(url_path("./a.png").as_deref(), Some("./a.png"));
        assert_eq!(url_path("data:image/png;base64,AAAA"), None);
        assert_eq!(url_path("https://cdn.example"), None);
    }

    #[test]
    fn test_cdn_reference_is_copied_and_rewritten() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(src.path(), "2024/03/photo.jpg", "jpeg");

        let index = ImageIndex::build(src.path());
        let record_dir = out.path().join("holiday");
        let body = "Intro\n\n![Holiday](https://cdn.example/2024/03/photo.jpg)";
        let result =
            ImageMaterializer::new(&index).materialize(body, &front_matter(None), &record_dir);

        assert!(result.body.contains("![Holiday](./photo.jpg)"));
        assert!(record_dir.join("photo.jpg").is_file());
        assert_eq!(result.copied, vec![record_dir.join("photo.jpg")]);
        assert_eq!(result.refs[0].rewritten.as_deref(), Some("./photo.jpg"));
    }

    #[test]
    fn test_ghost_size_variant_and_front_matter_fields() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(src.path(), "2024/03/cover.jpg", "cover");

        let index = ImageIndex::build(src.path());
        let record_dir = out.path().join("post");
        let cover = "https://example.com/content/images/size/w600/2024/03/cover.jpg";
        let mut fm = front_matter(Some(cover));
        fm.seo = Some(crate::models::Seo {
            title: None,
            description: None,
            image: Some(cover.to_string()),
        });
        let body = format!("[![]({cover})]({cover})");

        let result = ImageMaterializer::new(&index).materialize(&body, &fm, &record_dir);

        assert_eq!(result.body, "[![](./cover.jpg)](./cover.jpg)");
        assert_eq!(result.front_matter.featured_image.as_deref(), Some("./cover.jpg"));
        assert_eq!(result.front_matter.cover.as_deref(), Some("./cover.jpg"));
        assert_eq!(
            result.front_matter.seo.unwrap().image.as_deref(),
            Some("./cover.jpg")
        );
        assert_eq!(result.copied.len(), 1);
        let origins: Vec<RefOrigin> = result.refs.iter().map(|r| r.origin).collect();
        assert_eq!(
            origins,
            vec![
                RefOrigin::Body,
                RefOrigin::FrontMatter,
                RefOrigin::FrontMatter,
                RefOrigin::FrontMatter
            ]
        );
        assert!(result.refs.iter().all(|r| r.rewritten.as_deref() == Some("./cover.jpg")));
    }

    #[test]
    fn test_remote_reference_left_unchanged() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let index = ImageIndex::build(src.path());
        let record_dir = out.path().join("remote");
        let body = "![x](https://other.example/unknown.png)";

        let result =
            ImageMaterializer::new(&index).materialize(body, &front_matter(None), &record_dir);

        assert_eq!(result.body, body);
        assert!(!result.has_images());
        assert!(!record_dir.exists());
    }

    #[test]
    fn test_failed_copy_leaves_no_empty_bundle_dir() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(src.path(), "2024/03/gone.jpg", "jpeg");

        // Indexed by filename, then removed before the copy
        let index = ImageIndex::build(src.path());
        fs::remove_file(src.path().join("2024/03/gone.jpg")).unwrap();

        let record_dir = out.path().join("vanished");
        let body = "![x](https://cdn.example/gone.jpg)";
        let result =
            ImageMaterializer::new(&index).materialize(body, &front_matter(None), &record_dir);

        assert_eq!(result.body, body);
        assert!(result.copied.is_empty());
        assert!(!result.has_images());
        assert!(result.refs[0].rewritten.is_none());
        assert!(!record_dir.exists());
    }

    #[test]
    fn test_unwritable_record_dir_keeps_references() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(src.path(), "photo.jpg", "jpeg");

        let index = ImageIndex::build(src.path());
        let record_dir = out.path().join("blocked");
        fs::write(&record_dir, "not a directory").unwrap();

        let body = "![x](/content/images/photo.jpg)";
        let result =
            ImageMaterializer::new(&index).materialize(body, &front_matter(None), &record_dir);

        assert_eq!(result.body, body);
        assert!(!result.has_images());
        assert!(record_dir.is_file());
    }

    #[test]
    fn test_same_filename_from_distinct_sources_is_disambiguated() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(src.path(), "2023/01/photo.jpg", "old");
        write(src.path(), "2024/02/photo.jpg", "new");

        let index = ImageIndex::build(src.path());
        let record_dir = out.path().join("twins");
        let body = "![a](/content/images/2023/01/photo.jpg)\n\n![b](/content/images/2024/02/photo.jpg)\n\n![c](/content/images/2023/01/photo.jpg)";

        let result =
            ImageMaterializer::new(&index).materialize(body, &front_matter(None), &record_dir);

        assert_eq!(
            result.body,
            "![a](./photo.jpg)\n\n![b](./photo-1.jpg)\n\n![c](./photo.jpg)"
        );
        assert_eq!(result.copied.len(), 2);
        assert_eq!(fs::read_to_string(record_dir.join("photo.jpg")).unwrap(), "old");
        assert_eq!(fs::read_to_string(record_dir.join("photo-1.jpg")).unwrap(), "new");
    }

    #[test]
    fn test_filename_lookup_prefers_matching_path_suffix() {
        let src = tempdir().unwrap();
        write(src.path(), "a/logo.png", "a");
        write(src.path(), "b/logo.png", "b");

        let index = ImageIndex::build(src.path());
        assert_eq!(index.len(), 2);
        let resolved = index.resolve("https://cdn.example/assets/b/logo.png").unwrap();
        assert_eq!(resolved, src.path().join("b/logo.png"));
        let resolved = index.resolve("https://cdn.example/logo.png").unwrap();
        assert_eq!(resolved, src.path().join("a/logo.png"));
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let src = tempdir().unwrap();
        let index = ImageIndex::build(src.path());
        assert!(index.resolve("../../etc/passwd").is_none());
    }

    #[test]
    fn test_missing_root_yields_empty_index() {
        let dir = tempdir().unwrap();
        let index = ImageIndex::build(dir.path().join("missing"));
        assert!(index.is_empty());
        assert!(index.resolve("photo.jpg").is_none());
    }
}
