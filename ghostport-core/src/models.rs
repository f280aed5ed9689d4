//! Front matter model emitted at the top of every exported file.

use ghostport_types::{PublishStatus, RecordKind};
use serde::{Deserialize, Serialize};

/// SEO overrides nested under `seo:`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Seo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}

/// Hugo front matter for one post or page
///
/// Field order here is the order fields are written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_plain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<String>,

    pub slug: String,

    #[serde(rename = "type")]
    pub kind: RecordKind,

    #[serde(default)]
    pub draft: bool,

    /// Same information as `draft`, spelled out for themes that read it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PublishStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,

    #[serde(default = "default_reading_time")]
    pub reading_time: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<Seo>,
}

fn default_reading_time() -> u32 {
    1
}

impl FrontMatter {
    /// Mutable handles to every image-bearing field that is set
    /// (`featured_image`, `cover`, `seo.image`)
    pub fn image_fields_mut(&mut self) -> Vec<&mut String> {
        let mut fields = Vec::new();
        if let Some(image) = self.featured_image.as_mut() {
            fields.push(image);
        }
        if let Some(image) = self.cover.as_mut() {
            fields.push(image);
        }
        if let Some(image) = self.seo.as_mut().and_then(|seo| seo.image.as_mut()) {
            fields.push(image);
        }
        fields
    }

    /// Values of the image-bearing fields, in field order
    pub fn image_fields(&self) -> Vec<&str> {
        [
            self.featured_image.as_deref(),
            self.cover.as_deref(),
            self.seo.as_ref().and_then(|seo| seo.image.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrontMatter {
        FrontMatter {
            title: "Hello".into(),
            title_plain: "Hello".into(),
            date: None,
            lastmod: None,
            slug: "hello".into(),
            kind: RecordKind::Post,
            draft: false,
            status: None,
            author: None,
            author_bio: None,
            author_image: None,
            description: None,
            featured_image: Some("https://cdn.example/a.jpg".into()),
            cover: Some("https://cdn.example/a.jpg".into()),
            reading_time: 1,
            canonical_url: None,
            tags: vec![],
            categories: vec![],
            seo: Some(Seo {
                title: None,
                description: None,
                image: Some("https://cdn.example/og.jpg".into()),
            }),
        }
    }

    #[test]
    fn test_image_fields() {
        let mut fm = sample();
        assert_eq!(fm.image_fields().len(), 3);

        for field in fm.image_fields_mut() {
            *field = "./a.jpg".into();
        }
        assert_eq!(fm.featured_image.as_deref(), Some("./a.jpg"));
        assert_eq!(fm.seo.unwrap().image.as_deref(), Some("./a.jpg"));
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let mut fm = sample();
        fm.featured_image = None;
        fm.cover = None;
        fm.seo = None;
        let yaml = serde_yaml::to_string(&fm).unwrap();
        assert!(yaml.contains("title: Hello"));
        assert!(yaml.contains("type: post"));
        assert!(!yaml.contains("featured_image"));
        assert!(!yaml.contains("seo"));
        assert!(!yaml.contains("tags"));
        assert!(!yaml.contains("status"));
    }

    #[test]
    fn test_status_written_next_to_draft() {
        let mut fm = sample();
        fm.draft = true;
        fm.status = Some(PublishStatus::Draft);
        let yaml = serde_yaml::to_string(&fm).unwrap();
        assert!(yaml.contains("draft: true\nstatus: draft\n"));

        let parsed: FrontMatter = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.status, Some(PublishStatus::Draft));
    }
}
