//! Integration tests for the export pipeline
//!
//! These tests run whole backups through `Exporter` and inspect the content
//! tree it leaves behind.

use ghostport_core::frontmatter::parse_front_matter;
use ghostport_core::{validate, Backup, Config, Exporter, ImageIndex, Validation};
use ghostport_types::{ExportResult, PublishStatus};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const BACKUP: &str = r##"{
  "db": [{
    "meta": { "version": "5.0.0" },
    "data": {
      "posts": [
        {
          "id": "p1",
          "title": "Das geheime Leben der Bäume",
          "slug": "f0-9f-93-9a-das-geheime-leben-der-baeume",
          "html": "<p>Trees talk to each other. They share water too.</p><p><img src=\"__GHOST_URL__/content/images/2024/03/photo.jpg\" alt=\"\"></p><p><img src=\"https://cdn.example/2024/03/photo.jpg\"></p><p><img src=\"https://remote.example/elsewhere/unknown.png\" alt=\"remote\"></p>",
          "type": "post",
          "status": "published",
          "created_at": "2024-03-01T09:00:00.000Z",
          "updated_at": "2024-03-02T10:30:00.000Z",
          "published_at": "2024-03-01T12:00:00.000Z",
          "feature_image": "__GHOST_URL__/content/images/size/w600/2024/03/cover.png",
          "canonical_url": "__GHOST_URL__/trees/"
        },
        {
          "id": "p2",
          "title": "About Me",
          "html": "<p>Hi, I write about forests.</p>",
          "type": "page",
          "status": "published",
          "created_at": "2023-01-01T00:00:00.000Z"
        },
        {
          "id": "p3",
          "title": "Coming soon",
          "html": "<p>Later.</p>",
          "type": "post",
          "status": "scheduled"
        },
        {
          "id": "p4",
          "title": "📸",
          "html": "<p>Only an emoji for a title.</p>",
          "type": "post",
          "status": "draft"
        },
        {
          "id": 5,
          "title": "Old style page",
          "slug": "legacy",
          "html": "<p>From an old export.</p>",
          "page": true,
          "status": "draft"
        }
      ],
      "users": [
        { "id": "u1", "name": "Jane Doe", "bio": "Writes about trees" }
      ],
      "tags": [
        { "id": "t1", "name": "Nature" },
        { "id": "t2", "name": "Forests" },
        { "id": "t3", "name": "#hidden" }
      ],
      "posts_tags": [
        { "post_id": "p1", "tag_id": "t2", "sort_order": 1 },
        { "post_id": "p1", "tag_id": "t1", "sort_order": 0 },
        { "post_id": "p1", "tag_id": "t3", "sort_order": 2 }
      ],
      "posts_authors": [
        { "post_id": "p1", "author_id": "u1", "sort_order": 0 }
      ],
      "posts_meta": [
        { "post_id": "p1", "meta_description": "How trees communicate" }
      ]
    }
  }]
}"##;

fn setup(root: &Path) -> Config {
    let images = root.join("images/2024/03");
    fs::create_dir_all(&images).unwrap();
    fs::write(images.join("photo.jpg"), b"jpeg bytes").unwrap();
    fs::write(images.join("cover.png"), b"png bytes").unwrap();

    let mut config = Config::with_outputs(
        root.join("content/posts"),
        root.join("content/pages"),
        root.join("content/invalid"),
    );
    config.images = Some(root.join("images"));
    config.site_url = "https://blog.example/".into();
    config
}

#[test]
fn test_full_backup_export() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path());
    let backup = Backup::from_json_str(BACKUP).unwrap();

    let summary = Exporter::from_config(config).unwrap().run(&backup).unwrap();
    assert_eq!(summary.exported, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.invalid, 0);

    // Post with images becomes a bundle
    let bundle = dir.path().join("content/posts/das-geheime-leben-der-baeume");
    assert_eq!(fs::read(bundle.join("photo.jpg")).unwrap(), b"jpeg bytes");
    assert_eq!(fs::read(bundle.join("cover.png")).unwrap(), b"png bytes");

    let written = fs::read_to_string(bundle.join("index.md")).unwrap();
    let (fm, body) = parse_front_matter(&written).unwrap();

    assert_eq!(fm.slug, "das-geheime-leben-der-baeume");
    assert_eq!(fm.title, "Das geheime Leben der Bäume");
    assert_eq!(fm.date.as_deref(), Some("2024-03-01T12:00:00.000Z"));
    assert_eq!(fm.lastmod.as_deref(), Some("2024-03-02T10:30:00.000Z"));
    assert_eq!(fm.tags, vec!["Nature", "Forests"]);
    assert_eq!(fm.categories, vec!["Nature"]);
    assert_eq!(fm.author.as_deref(), Some("Jane Doe"));
    assert_eq!(fm.author_bio.as_deref(), Some("Writes about trees"));
    assert_eq!(fm.canonical_url.as_deref(), Some("https://blog.example/trees/"));
    assert_eq!(fm.featured_image.as_deref(), Some("./cover.png"));
    assert_eq!(fm.cover.as_deref(), Some("./cover.png"));
    assert!(!fm.draft);

    let seo = fm.seo.unwrap();
    assert_eq!(seo.description.as_deref(), Some("How trees communicate"));
    assert_eq!(seo.image.as_deref(), Some("./cover.png"));

    assert!(body.contains("![Das geheime Leben der Bäume](./photo.jpg)"));
    assert!(!body.contains("cdn.example"));
    assert!(!body.contains("__GHOST_URL__"));
    assert!(body.contains("https://remote.example/elsewhere/unknown.png"));
    assert_eq!(fm.description.as_deref(), Some("Trees talk to each other. They share water too."));

    // Pages without images stay single files
    let about = dir.path().join("content/pages/about-me.md");
    assert_eq!(validate(&about), Validation::Valid);
    let (about_fm, _) = parse_front_matter(&fs::read_to_string(&about).unwrap()).unwrap();
    assert_eq!(about_fm.author.as_deref(), Some("Unknown"));

    // Legacy `page: true` with a numeric id
    let legacy = dir.path().join("content/pages/legacy.md");
    let (legacy_fm, _) = parse_front_matter(&fs::read_to_string(&legacy).unwrap()).unwrap();
    assert!(legacy_fm.draft);

    let failed = summary
        .records
        .iter()
        .find(|r| r.id == "p4")
        .map(|r| &r.result)
        .unwrap();
    assert!(matches!(failed, ExportResult::Failed { .. }));
    assert!(!dir.path().join("content/invalid").read_dir().unwrap().any(|_| true));
}

#[test]
fn test_default_status_override_and_skip_drafts() {
    let dir = tempdir().unwrap();
    let mut config = setup(dir.path());
    config.default_status = Some(PublishStatus::Draft);
    config.skip_drafts = true;
    let backup = Backup::from_json_str(BACKUP).unwrap();

    let summary = Exporter::from_config(config).unwrap().run(&backup).unwrap();

    // p4 and the legacy page are drafts and are skipped before slug resolution
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.exported, 2);

    let about = fs::read_to_string(dir.path().join("content/pages/about-me.md")).unwrap();
    assert!(about.contains("slug: about-me"));
    assert!(about.contains("draft: true"));
    assert!(about.contains("status: draft"));
    assert!(!dir.path().join("content/pages/legacy.md").exists());
}

#[test]
fn test_rerun_overwrites_in_place() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path());
    let backup = Backup::from_json_str(BACKUP).unwrap();

    Exporter::from_config(config.clone()).unwrap().run(&backup).unwrap();
    let second = Exporter::from_config(config).unwrap().run(&backup).unwrap();

    assert_eq!(second.exported, 3);
    assert!(dir.path().join("content/pages/about-me.md").is_file());
    assert!(!dir.path().join("content/pages/about-me-2.md").exists());
}

#[test]
fn test_missing_images_dir_still_exports() {
    let dir = tempdir().unwrap();
    let config = Config::with_outputs(
        dir.path().join("posts"),
        dir.path().join("pages"),
        dir.path().join("invalid"),
    );
    let exporter = Exporter::new(config, ImageIndex::build(dir.path().join("nope")));
    let backup = Backup::from_json_str(BACKUP).unwrap();

    let summary = exporter.run(&backup).unwrap();
    assert_eq!(summary.exported, 3);

    // Nothing copied, so the post is a single file with remote references kept
    let post = dir.path().join("posts/das-geheime-leben-der-baeume.md");
    let written = fs::read_to_string(post).unwrap();
    assert!(written.contains("https://example.com/content/images/2024/03/photo.jpg"));
}
