//! Configuration parsing and management.

use ghostport_types::{PublishStatus, RecordKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "ghostport.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Main configuration struct matching the ghostport.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ghost JSON backup
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Ghost `content/images` directory
    #[serde(default)]
    pub images: Option<PathBuf>,

    #[serde(default = "default_output_posts")]
    pub output_posts: PathBuf,

    #[serde(default = "default_output_pages")]
    pub output_pages: PathBuf,

    #[serde(default = "default_output_invalid")]
    pub output_invalid: PathBuf,

    /// Replaces `__GHOST_URL__` placeholders
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Forces every exported record to this status
    #[serde(default)]
    pub default_status: Option<PublishStatus>,

    #[serde(default)]
    pub skip_drafts: bool,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_output_posts() -> PathBuf {
    PathBuf::from("content/posts")
}

fn default_output_pages() -> PathBuf {
    PathBuf::from("content/pages")
}

fn default_output_invalid() -> PathBuf {
    PathBuf::from("content/invalid")
}

fn default_site_url() -> String {
    String::from("https://example.com")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            images: None,
            output_posts: default_output_posts(),
            output_pages: default_output_pages(),
            output_invalid: default_output_invalid(),
            site_url: default_site_url(),
            default_status: None,
            skip_drafts: false,
            config_path: None,
        }
    }
}

/// Values supplied on the command line; `Some` wins over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input: Option<PathBuf>,
    pub images: Option<PathBuf>,
    pub output_posts: Option<PathBuf>,
    pub output_pages: Option<PathBuf>,
    pub output_invalid: Option<PathBuf>,
    pub site_url: Option<String>,
    pub default_status: Option<PublishStatus>,
    pub skip_drafts: bool,
}

impl Config {
    /// Defaults with the three output roots replaced
    pub fn with_outputs(
        posts: impl Into<PathBuf>,
        pages: impl Into<PathBuf>,
        invalid: impl Into<PathBuf>,
    ) -> Self {
        Self {
            output_posts: posts.into(),
            output_pages: pages.into(),
            output_invalid: invalid.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&contents)?
        };

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load an explicit config file, or `ghostport.yml` if present, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = Path::new(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    tracing::debug!("Using {}", candidate.display());
                    Self::from_file(candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply command-line overrides
    ///
    /// Paths given on the command line are relative to the working
    /// directory, not the config file.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let cwd = |p: PathBuf| {
            if p.is_absolute() {
                p
            } else {
                std::env::current_dir().map(|d| d.join(&p)).unwrap_or(p)
            }
        };

        if let Some(input) = overrides.input {
            self.input = Some(cwd(input));
        }
        if let Some(images) = overrides.images {
            self.images = Some(cwd(images));
        }
        if let Some(posts) = overrides.output_posts {
            self.output_posts = cwd(posts);
        }
        if let Some(pages) = overrides.output_pages {
            self.output_pages = cwd(pages);
        }
        if let Some(invalid) = overrides.output_invalid {
            self.output_invalid = cwd(invalid);
        }
        if let Some(site_url) = overrides.site_url {
            self.site_url = site_url;
        }
        if overrides.default_status.is_some() {
            self.default_status = overrides.default_status;
        }
        self.skip_drafts |= overrides.skip_drafts;
    }

    /// Backup file, resolved relative to config file
    pub fn input_path(&self) -> Result<PathBuf, ConfigError> {
        self.input
            .as_deref()
            .map(|p| self.resolve_path(p))
            .ok_or_else(|| ConfigError::MissingField("input".to_string()))
    }

    /// Images directory, resolved relative to config file
    pub fn images_dir(&self) -> Result<PathBuf, ConfigError> {
        self.images
            .as_deref()
            .map(|p| self.resolve_path(p))
            .ok_or_else(|| ConfigError::MissingField("images".to_string()))
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.resolve_path(&self.output_posts)
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.resolve_path(&self.output_pages)
    }

    pub fn invalid_dir(&self) -> PathBuf {
        self.resolve_path(&self.output_invalid)
    }

    /// Output root for a record kind
    pub fn output_dir(&self, kind: RecordKind) -> PathBuf {
        match kind {
            RecordKind::Post => self.posts_dir(),
            RecordKind::Page => self.pages_dir(),
        }
    }

    /// Site URL without trailing slash
    pub fn normalized_site_url(&self) -> String {
        normalize_site_url(&self.site_url)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}

/// Trim whitespace and trailing slashes from a site URL
pub fn normalize_site_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
