use anyhow::{bail, Result};

use super::Workspace;
use crate::api::{DriveError, Remote};
use crate::ui;

const FAILURES_SHOWN: usize = 10;

/// Share a version with anyone holding the link and make it the public
/// version. The manifest only changes if every share succeeded.
pub fn run<R, F>(ws: &Workspace, version: &str, recursive: bool, connect: F) -> Result<()>
where
    R: Remote,
    F: FnOnce() -> Result<R>,
{
    let mut config = ws.load()?;
    let folder_id = config.version_folder_id(version)?;
    let remote = connect()?;

    if recursive {
        println!("Publishing folder and contents (recursive)...");
        let failed = share_recursive(&remote, &folder_id);
        if !failed.is_empty() {
            ui::warning(format!("Failed to publish {} items:", failed.len()));
            ui::print_truncated(&failed, FAILURES_SHOWN);
            bail!(
                "Version '{}' was not fully published; public version unchanged.",
                version
            );
        }
        println!("Version '{}' is now fully public.", version);
    } else {
        println!("Publishing folder only...");
        if let Err(e) = remote.share_publicly(&folder_id) {
            report_failure("share", &folder_id, &e);
            bail!("Failed to publish version '{}': {}", version, e);
        }
        println!("Version '{}' folder is now public.", version);
    }

    config.set_public(version)?;
    ws.save(&config)?;
    println!("Set '{}' as the public version.", version);
    Ok(())
}

/// Share `folder_id` and everything below it. Returns labels for the
/// items that could not be shared or listed.
pub fn share_recursive<R: Remote>(remote: &R, folder_id: &str) -> Vec<String> {
    let mut failed = Vec::new();

    if let Err(e) = remote.share_publicly(folder_id) {
        report_failure("share", folder_id, &e);
        failed.push(format!("folder:{}", folder_id));
    }

    match remote.list_children(folder_id) {
        Ok(items) => {
            for item in items {
                if item.is_folder() {
                    failed.extend(share_recursive(remote, &item.id));
                } else if let Err(e) = remote.share_publicly(&item.id) {
                    report_failure("share", &item.name, &e);
                    failed.push(format!("file:{}", item.name));
                }
            }
        }
        Err(e) => {
            report_failure("list", folder_id, &e);
            failed.push(format!("folder_listing:{}", folder_id));
        }
    }
    failed
}

fn report_failure(action: &str, target: &str, e: &DriveError) {
    if e.is_forbidden() {
        tracing::warn!("permission denied trying to {} {}: {}", action, target, e);
    } else if e.is_not_found() {
        tracing::warn!("{} not found: {}", target, e);
    } else {
        tracing::warn!("failed to {} {}: {}", action, target, e);
    }
}
