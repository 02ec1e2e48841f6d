use anyhow::{anyhow, bail, Context, Result};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};

use super::Workspace;
use crate::api::{DriveError, Remote};
use crate::config::ProjectConfig;
use crate::ui;

/// Alias that resolves to the public version.
pub const LATEST: &str = "latest";

/// Download `version` (or the public version for `latest`) into its
/// local path.
pub fn run<R, F>(ws: &Workspace, version: &str, connect: F) -> Result<DownloadReport>
where
    R: Remote,
    F: FnOnce() -> Result<R>,
{
    let config = ws.load()?;
    let name = resolve_version(&config, version)?;
    let remote = connect()?;
    fetch(&config, &name, &remote)
}

/// Map the `latest` alias to the public version; other names must be
/// recorded versions.
pub fn resolve_version(config: &ProjectConfig, requested: &str) -> Result<String> {
    if requested.eq_ignore_ascii_case(LATEST) {
        let public = config
            .public_version
            .clone()
            .ok_or_else(|| anyhow!("No public version set in config."))?;
        if !config.versions.contains_key(&public) {
            bail!("Public version '{}' missing from versions map.", public);
        }
        return Ok(public);
    }
    config.version(requested)?;
    Ok(requested.to_string())
}

/// Files written and items skipped by one download.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: Vec<String>,
}

/// Pull the version folder's tree into the version's local path, merging
/// over whatever is already there.
pub fn fetch<R: Remote>(config: &ProjectConfig, name: &str, remote: &R) -> Result<DownloadReport> {
    let entry = config.version(name)?;
    let folder_id = config.version_folder_id(name)?;
    let dest = PathBuf::from(&entry.local_path);
    fs::create_dir_all(&dest)
        .with_context(|| format!("Failed to create '{}'", dest.display()))?;
    println!("Downloading '{}' to {}", name, dest.display());

    let mut downloader = Downloader {
        remote,
        progress: ui::spinner("Downloading"),
        report: DownloadReport::default(),
    };
    let result = downloader.fetch_folder(&folder_id, &dest);
    downloader.progress.finish_and_clear();
    if let Err(e) = result {
        if e.is_forbidden() {
            bail!(
                "Download failed: This folder is not public. \
                 Publish it with 'gdvc publish {}' or authenticate.",
                name
            );
        }
        bail!("Download failed: {}", e);
    }

    let report = downloader.report;
    if !report.skipped.is_empty() {
        ui::warning(format!(
            "Skipped {} Google-native or unsafe items:",
            report.skipped.len()
        ));
        ui::print_truncated(&report.skipped, 10);
    }
    println!("Downloaded {} files to {}", report.downloaded, dest.display());
    Ok(report)
}

/// A remote name usable as a single local path component.
fn safe_component(name: &str) -> Option<&str> {
    let bad = name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']);
    (!bad).then_some(name)
}

struct Downloader<'a, R: Remote> {
    remote: &'a R,
    progress: ProgressBar,
    report: DownloadReport,
}

impl<'a, R: Remote> Downloader<'a, R> {
    fn fetch_folder(&mut self, folder_id: &str, dest: &Path) -> Result<(), DriveError> {
        for item in self.remote.list_children(folder_id)? {
            let Some(name) = safe_component(&item.name) else {
                tracing::warn!("skipping remote item with unsafe name {:?}", item.name);
                self.report.skipped.push(item.name.clone());
                continue;
            };
            let target = dest.join(name);

            if item.is_folder() {
                fs::create_dir_all(&target).map_err(|source| DriveError::Io {
                    path: target.clone(),
                    source,
                })?;
                self.fetch_folder(&item.id, &target)?;
            } else if item.is_google_native() {
                self.report.skipped.push(target.display().to_string());
            } else {
                self.progress.set_message(name.to_string());
                self.remote.download_file(&item.id, &target)?;
                self.report.downloaded += 1;
                self.progress.inc(1);
            }
        }
        Ok(())
    }
}
