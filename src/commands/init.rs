use anyhow::{Context, Result};

use super::Workspace;
use crate::config::ProjectConfig;
use crate::ui;

/// Create a fresh manifest pointing at `folder_url`, tracking
/// `directories`. Asks before overwriting an existing manifest.
pub fn run(ws: &Workspace, folder_url: &str, directories: &[String]) -> Result<()> {
    if ws.store.exists() {
        let prompt = format!(
            "Config file '{}' already exists. Overwrite?",
            ws.store.path().display()
        );
        if !ui::confirm(&prompt, ws.assume_yes)? {
            println!("Init cancelled.");
            return Ok(());
        }
    }

    let config = ProjectConfig::new(folder_url, directories)
        .context("Invalid Google Drive folder URL provided.")?;
    let folder_id = config.root_folder_id()?;
    ws.save(&config).context("Failed to save config")?;

    println!("Initialized GDVC config with folder: {}", folder_url);
    println!("Folder ID: {}", folder_id);
    if config.tracked_directories.is_empty() {
        println!("No directories tracked yet. Use 'gdvc track add <dir>' to add directories.");
    } else {
        println!(
            "Tracking directories: {}",
            config.tracked_directories.join(", ")
        );
    }
    println!("Config saved to: {}", ws.store.path().display());
    Ok(())
}
