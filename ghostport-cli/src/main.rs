//! # ghostport CLI
//!
//! Command-line interface for converting Ghost backups into Hugo content.

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ghostport_core::ConfigOverrides;
use ghostport_types::PublishStatus;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ghostport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to ./ghostport.yml if present)
    #[arg(long, global = true, env = "GHOSTPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample ghostport.yml
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,

        /// Overwrite an existing ghostport.yml
        #[arg(long)]
        force: bool,
    },

    /// Convert a Ghost backup into Hugo posts and pages
    Export(ExportArgs),

    /// Re-validate exported files
    Verify {
        /// Move invalid files into the invalid output folder
        #[arg(long)]
        quarantine: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        outputs: OutputArgs,
    },
}

#[derive(Args)]
pub struct ExportArgs {
    /// Path to the Ghost JSON backup file
    #[arg(long, env = "GHOSTPORT_INPUT")]
    input: Option<PathBuf>,

    /// Path to the Ghost images directory
    #[arg(long, env = "GHOSTPORT_IMAGES")]
    images: Option<PathBuf>,

    #[command(flatten)]
    outputs: OutputArgs,

    /// Base URL replacing __GHOST_URL__ placeholders
    #[arg(long, env = "GHOSTPORT_SITE_URL")]
    site_url: Option<String>,

    /// Override every record's status
    #[arg(long, value_enum)]
    default_status: Option<DefaultStatus>,

    /// Do not export drafts
    #[arg(long)]
    skip_drafts: bool,

    /// Emit the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output folder for posts
    #[arg(long)]
    output_posts: Option<PathBuf>,

    /// Output folder for pages
    #[arg(long)]
    output_pages: Option<PathBuf>,

    /// Folder for invalid outputs
    #[arg(long)]
    output_invalid: Option<PathBuf>,
}

impl OutputArgs {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            output_posts: self.output_posts,
            output_pages: self.output_pages,
            output_invalid: self.output_invalid,
            ..Default::default()
        }
    }
}

impl ExportArgs {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            input: self.input,
            images: self.images,
            site_url: self.site_url,
            default_status: self.default_status.map(Into::into),
            skip_drafts: self.skip_drafts,
            ..self.outputs.into_overrides()
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
pub enum DefaultStatus {
    Published,
    Draft,
}

impl From<DefaultStatus> for PublishStatus {
    fn from(status: DefaultStatus) -> Self {
        match status {
            DefaultStatus::Published => PublishStatus::Published,
            DefaultStatus::Draft => PublishStatus::Draft,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for the summary
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path, force } => commands::init_project(path.as_deref(), force),
        Commands::Export(args) => {
            let json = args.json;
            commands::export_backup(cli.config.as_deref(), args.into_overrides(), json)
        }
        Commands::Verify {
            quarantine,
            json,
            outputs,
        } => commands::verify_output(
            cli.config.as_deref(),
            outputs.into_overrides(),
            quarantine,
            json,
        ),
    }
}
