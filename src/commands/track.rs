use anyhow::Result;
use std::path::Path;

use super::Workspace;
use crate::ui;

pub fn add(ws: &Workspace, directory: &str) -> Result<()> {
    let mut config = ws.load()?;
    if !config.track(directory) {
        println!("Directory '{}' is already being tracked.", directory);
        return Ok(());
    }
    ws.save(&config)?;
    println!("Added '{}' to tracked directories.", directory);
    Ok(())
}

pub fn remove(ws: &Workspace, directory: &str) -> Result<()> {
    let mut config = ws.load()?;
    if !config.untrack(directory) {
        println!("Directory '{}' is not being tracked.", directory);
        return Ok(());
    }
    ws.save(&config)?;
    println!("Removed '{}' from tracked directories.", directory);
    Ok(())
}

/// Print tracked directories, marking the ones missing locally.
pub fn list(ws: &Workspace) -> Result<()> {
    let config = ws.load()?;
    if config.tracked_directories.is_empty() {
        println!("No directories are currently being tracked.");
        println!("   Use 'gdvc track add <directory>' to start tracking directories.");
        return Ok(());
    }
    println!("Tracked directories:");
    for dir in &config.tracked_directories {
        println!("  {} {}", ui::status_mark(Path::new(dir).is_dir()), dir);
    }
    Ok(())
}
