//! Init command implementation.

use anyhow::{Context, Result};
use ghostport_core::config::DEFAULT_CONFIG_FILE;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../../../ghostport.yml.example");

/// Write a sample ghostport.yml into `path`
pub fn init_project(path: Option<&Path>, force: bool) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    let config_path = root.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !force {
        println!("{} already exists at {:?}", DEFAULT_CONFIG_FILE, config_path);
        return Ok(());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;

    println!("✓ Created {:?}", config_path);
    println!("  - Point `input` at your Ghost JSON backup and `images` at content/images");
    println!("  - Then run: ghostport export");
    Ok(())
}
