use anyhow::{bail, Result};

use super::Workspace;
use crate::config::ConfigError;
use crate::folder_url::folder_id_from_url;

/// Point the manifest at a new Drive root, keeping only the current
/// version. The old manifest is backed up first.
pub fn run(ws: &Workspace, new_folder_url: &str) -> Result<()> {
    if !ws.store.exists() {
        return Err(ConfigError::NotFound(ws.store.path().to_path_buf()).into());
    }
    let Some(new_folder_id) = folder_id_from_url(new_folder_url) else {
        bail!("Invalid Google Drive folder URL provided.");
    };

    let old = ws.load()?;
    let (new, dropped) = old.rerooted(new_folder_url)?;

    let backup = ws.store.backup(&old)?;
    println!("Backed up old config to: {}", backup.display());
    ws.save(&new)?;

    let preserved = new.current_version.as_deref().unwrap_or_default();
    println!("Changed folder root to: {}", new_folder_url);
    println!("New folder ID: {}", new_folder_id);
    println!("Preserved version: {}", preserved);
    if new.tracked_directories.is_empty() {
        println!("Preserved tracked directories: None");
    } else {
        println!(
            "Preserved tracked directories: {}",
            new.tracked_directories.join(", ")
        );
    }
    if let (Some(public), None) = (&old.public_version, &new.public_version) {
        println!("Public version '{}' was dropped; run 'gdvc publish' again.", public);
    }
    println!("Removed {} historical versions", dropped);
    Ok(())
}
