use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;

use super::{download, Workspace};
use crate::api::Remote;

/// Download the public version unless its local path already has content.
/// Returns true if a download happened.
pub fn run<R, F>(ws: &Workspace, connect: F) -> Result<bool>
where
    R: Remote,
    F: FnOnce() -> Result<R>,
{
    let config = ws.load()?;
    let latest = config
        .public_version
        .clone()
        .ok_or_else(|| anyhow!("No public version set in config."))?;
    let entry = config.version(&latest)?;

    if has_content(Path::new(&entry.local_path)) {
        println!("Already up-to-date with version '{}'", latest);
        return Ok(false);
    }

    println!("Updating to latest version: {}", latest);
    let remote = connect()?;
    download::fetch(&config, &latest, &remote)?;
    Ok(true)
}

fn has_content(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
