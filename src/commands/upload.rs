use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};

use super::Workspace;
use crate::api::Remote;
use crate::config::{ProjectConfig, VersionEntry};
use crate::folder_url::sharing_url;
use crate::scan::{self, UploadScan};
use crate::ui;

const SENSITIVE_SHOWN: usize = 5;

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub version: String,
    /// Upload this folder's contents instead of the tracked directories.
    pub local_folder: Option<PathBuf>,
    pub public: bool,
    pub dry_run: bool,
}

/// What goes into the version folder.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UploadPlan {
    /// The folder's contents land directly in the version folder.
    Contents(PathBuf),
    /// Each directory becomes a subfolder of the version folder.
    Tracked {
        existing: Vec<PathBuf>,
        missing: Vec<String>,
    },
}

impl UploadPlan {
    fn for_folder(folder: &Path) -> Result<Self> {
        if !folder.is_dir() {
            bail!("Local folder '{}' does not exist.", folder.display());
        }
        Ok(UploadPlan::Contents(folder.to_path_buf()))
    }

    fn for_tracked(config: &ProjectConfig) -> Result<Self> {
        if config.tracked_directories.is_empty() {
            bail!(
                "No directories are being tracked. \
                 Use 'gdvc track add <directory>' to add directories."
            );
        }
        let (existing, missing): (Vec<_>, Vec<_>) = config
            .tracked_directories
            .iter()
            .cloned()
            .partition(|dir| Path::new(dir).is_dir());
        if existing.is_empty() {
            bail!("None of the tracked directories exist locally.");
        }
        Ok(UploadPlan::Tracked {
            existing: existing.into_iter().map(PathBuf::from).collect(),
            missing,
        })
    }

    fn roots(&self) -> Vec<PathBuf> {
        match self {
            UploadPlan::Contents(folder) => vec![folder.clone()],
            UploadPlan::Tracked { existing, .. } => existing.clone(),
        }
    }

    fn missing(&self) -> &[String] {
        match self {
            UploadPlan::Contents(_) => &[],
            UploadPlan::Tracked { missing, .. } => missing,
        }
    }
}

/// Counts from one upload run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub version_folder_id: String,
    pub uploaded: usize,
    pub failed: Vec<String>,
}

/// Upload a version and record it as the current one.
pub fn run<R, F>(ws: &Workspace, opts: &UploadOptions, connect: F) -> Result<Option<UploadReport>>
where
    R: Remote,
    F: FnOnce() -> Result<R>,
{
    // Folder mode and its preview never need the manifest.
    let plan = match &opts.local_folder {
        Some(folder) => UploadPlan::for_folder(folder)?,
        None => UploadPlan::for_tracked(&ws.load()?)?,
    };

    if opts.dry_run {
        preview(&plan);
        return Ok(None);
    }

    if !plan.missing().is_empty() {
        ui::warning(format!(
            "Missing directories (will be skipped): {}",
            plan.missing().join(", ")
        ));
    }

    let scan = UploadScan::of(&plan.roots());
    if opts.public && !confirm_public(&scan, ws.assume_yes)? {
        bail!("Upload cancelled.");
    }

    let mut config = ws.load()?;
    let root_id = config.root_folder_id()?;
    let remote = connect()?;
    let version_id = version_folder(&remote, &root_id, &opts.version)?;

    let mut uploader = Uploader {
        remote: &remote,
        public: opts.public,
        progress: ui::progress_bar(scan.total() as u64, "Uploading"),
        report: UploadReport {
            version_folder_id: version_id.clone(),
            ..UploadReport::default()
        },
        ancestors: Vec::new(),
    };
    uploader.share(&version_id, &opts.version);
    match &plan {
        UploadPlan::Contents(folder) => uploader.upload_contents(folder, &version_id)?,
        UploadPlan::Tracked { existing, .. } => {
            for dir in existing {
                uploader.progress.println(format!("Uploading directory: {}", dir.display()));
                uploader.upload_dir(dir, &version_id)?;
            }
        }
    }
    uploader.progress.finish_and_clear();
    let report = uploader.report;

    let url = sharing_url(&version_id);
    config.record_version(&opts.version, VersionEntry::new(url.clone(), opts.public));
    ws.save(&config)?;

    println!(
        "Uploaded version '{}' ({} files)",
        opts.version, report.uploaded
    );
    if let UploadPlan::Tracked { existing, .. } = &plan {
        let names: Vec<String> = existing.iter().map(|d| d.display().to_string()).collect();
        println!("Included directories: {}", names.join(", "));
    }
    if !report.failed.is_empty() {
        ui::warning(format!("{} files failed to upload:", report.failed.len()));
        ui::print_truncated(&report.failed, 10);
    }
    if opts.public {
        println!("Public link (unauthenticated downloads OK): {}", url);
    } else {
        println!("Uploaded privately. Unauthenticated downloads will NOT work.");
    }
    Ok(Some(report))
}

/// Reuse the version folder if one with that name already exists under
/// the root, else create it.
fn version_folder<R: Remote>(remote: &R, root_id: &str, version: &str) -> Result<String> {
    let existing = remote
        .find_folder(root_id, version)
        .context("Failed to query Drive")?;
    match existing {
        Some(id) => {
            println!("Reusing existing version folder '{}' (id={})", version, id);
            Ok(id)
        }
        None => {
            let id = remote
                .create_folder(root_id, version)
                .with_context(|| format!("Failed to create version folder '{}'", version))?;
            println!("Created version folder '{}'", version);
            Ok(id)
        }
    }
}

/// Summarize a public upload and ask for confirmation. Refuses outright
/// when sensitive files are present.
fn confirm_public(scan: &UploadScan, assume_yes: bool) -> Result<bool> {
    println!("\nUpload Summary: {} files", scan.total());
    if scan.has_sensitive() {
        ui::warning(format!("Found {} sensitive files", scan.sensitive.len()));
        let shown: Vec<String> = scan
            .sensitive
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        ui::print_truncated(&shown, SENSITIVE_SHOWN);
        println!("\nRefusing to make sensitive files public. Upload without --public instead.");
        return Ok(false);
    }
    println!("Files will be PUBLIC (anyone with the link can download)");
    ui::confirm("Continue?", assume_yes)
}

/// List what an upload would send without touching Drive.
fn preview(plan: &UploadPlan) {
    let scan = UploadScan::of(&plan.roots());
    println!("\nDry Run - Upload Preview: {} files", scan.total());
    if !plan.missing().is_empty() {
        println!("Missing directories (skipped): {}", plan.missing().join(", "));
    }
    if scan.has_sensitive() {
        println!("Sensitive files found ({}):", scan.sensitive.len());
        for f in &scan.sensitive {
            println!("  SENSITIVE: {}", f.display());
        }
    }
    println!("All files to upload:");
    for f in &scan.files {
        let status = if scan::is_sensitive(f) { "SENSITIVE" } else { "OK" };
        println!("  [{}] {}", status, f.display());
    }
}

/// Name a local directory gets on Drive.
fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            fs::canonicalize(path)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "root".to_string())
}

struct Uploader<'a, R: Remote> {
    remote: &'a R,
    public: bool,
    progress: ProgressBar,
    report: UploadReport,
    /// Canonical paths of the directories on the current upload path.
    ancestors: Vec<PathBuf>,
}

impl<'a, R: Remote> Uploader<'a, R> {
    /// Recreate `local` as a subfolder of `parent`, then fill it.
    fn upload_dir(&mut self, local: &Path, parent: &str) -> Result<()> {
        let name = folder_name(local);
        let id = self
            .remote
            .create_folder(parent, &name)
            .with_context(|| format!("Failed to create folder '{}'", name))?;
        self.share(&id, &name);
        self.upload_contents(local, &id)
    }

    /// Upload the entries of `local` into `folder_id`. Individual file
    /// failures are recorded and skipped. Symlinks are followed; a link back
    /// into a directory already being uploaded is skipped.
    fn upload_contents(&mut self, local: &Path, folder_id: &str) -> Result<()> {
        let real = fs::canonicalize(local)
            .with_context(|| format!("Failed to resolve '{}'", local.display()))?;
        if self.ancestors.contains(&real) {
            self.progress
                .println(format!("Skipping symlink loop at {}", local.display()));
            return Ok(());
        }
        self.ancestors.push(real);
        let result = self.upload_entries(local, folder_id);
        self.ancestors.pop();
        result
    }

    fn upload_entries(&mut self, local: &Path, folder_id: &str) -> Result<()> {
        let mut entries: Vec<PathBuf> = fs::read_dir(local)
            .with_context(|| format!("Failed to read '{}'", local.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();
        entries.sort();

        for path in entries {
            if path.is_file() {
                self.upload_file(&path, folder_id);
            } else if path.is_dir() {
                self.upload_dir(&path, folder_id)?;
            }
        }
        Ok(())
    }

    fn upload_file(&mut self, path: &Path, folder_id: &str) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.progress.set_message(name.clone());
        match self.remote.upload_file(folder_id, &name, path) {
            Ok(id) => {
                tracing::debug!("uploaded {} as {}", path.display(), id);
                self.share(&id, &name);
                self.report.uploaded += 1;
            }
            Err(e) => {
                self.progress
                    .println(format!("Failed to upload {}: {}", path.display(), e));
                self.report.failed.push(path.display().to_string());
            }
        }
        self.progress.inc(1);
    }

    /// Make `id` public when uploading publicly. Failures only warn; the
    /// item can be shared later with `gdvc publish`.
    fn share(&self, id: &str, label: &str) {
        if !self.public {
            return;
        }
        if let Err(e) = self.remote.share_publicly(id) {
            self.progress
                .println(format!("Failed to set public permission on {}: {}", label, e));
        }
    }
}
