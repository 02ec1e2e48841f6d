// Project manifest: the single JSON file that records where versions live
// on Drive, which one is active, which one is public and which local
// directories are tracked.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::folder_url::folder_id_from_url;

/// Default manifest location, relative to the working directory.
pub const CONFIG_FILE: &str = ".gdvc_config.json";

/// Manifest errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file '{}' not found. Run 'gdvc init' first.", .0.display())]
    NotFound(PathBuf),

    #[error("Config file '{}' is not valid: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to access config file '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid Google Drive folder URL: {0}")]
    InvalidFolderUrl(String),

    #[error("Version '{0}' not found in config.")]
    UnknownVersion(String),

    #[error("No current version found in config.")]
    NoCurrentVersion,
}

fn default_local_path() -> String {
    ".".into()
}

/// One uploaded version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// Sharing URL of the version folder.
    pub url: String,
    /// Directory the version downloads into.
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default)]
    pub public: bool,
}

impl VersionEntry {
    pub fn new(url: impl Into<String>, public: bool) -> Self {
        VersionEntry {
            url: url.into(),
            local_path: default_local_path(),
            public,
        }
    }
}

/// Older manifests stored a version as its bare URL.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredVersion {
    Legacy(String),
    Entry(VersionEntry),
}

#[derive(Deserialize)]
struct StoredConfig {
    drive_folder_url: String,
    versions: IndexMap<String, StoredVersion>,
    #[serde(default)]
    current_version: Option<String>,
    #[serde(default)]
    public_version: Option<String>,
    #[serde(default)]
    tracked_directories: Vec<String>,
}

/// In-memory manifest.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub drive_folder_url: String,
    pub versions: IndexMap<String, VersionEntry>,
    pub current_version: Option<String>,
    pub public_version: Option<String>,
    pub tracked_directories: Vec<String>,
}

impl ProjectConfig {
    /// A fresh manifest for `folder_url`. Fails if the URL carries no
    /// folder ID.
    pub fn new(folder_url: &str, tracked: &[String]) -> Result<Self, ConfigError> {
        if folder_id_from_url(folder_url).is_none() {
            return Err(ConfigError::InvalidFolderUrl(folder_url.to_string()));
        }
        let mut config = ProjectConfig {
            drive_folder_url: folder_url.to_string(),
            versions: IndexMap::new(),
            current_version: None,
            public_version: None,
            tracked_directories: Vec::new(),
        };
        for dir in tracked {
            config.track(dir);
        }
        Ok(config)
    }

    /// Folder ID of the Drive root all versions are created under.
    pub fn root_folder_id(&self) -> Result<String, ConfigError> {
        folder_id_from_url(&self.drive_folder_url)
            .ok_or_else(|| ConfigError::InvalidFolderUrl(self.drive_folder_url.clone()))
    }

    pub fn version(&self, name: &str) -> Result<&VersionEntry, ConfigError> {
        self.versions
            .get(name)
            .ok_or_else(|| ConfigError::UnknownVersion(name.to_string()))
    }

    /// Folder ID of a recorded version.
    pub fn version_folder_id(&self, name: &str) -> Result<String, ConfigError> {
        let entry = self.version(name)?;
        folder_id_from_url(&entry.url)
            .ok_or_else(|| ConfigError::InvalidFolderUrl(entry.url.clone()))
    }

    /// Record an upload and make it the active version. Re-uploading a
    /// name replaces its entry in place.
    pub fn record_version(&mut self, name: &str, entry: VersionEntry) {
        self.versions.insert(name.to_string(), entry);
        self.current_version = Some(name.to_string());
    }

    /// Mark `name` as the public version.
    pub fn set_public(&mut self, name: &str) -> Result<(), ConfigError> {
        let entry = self
            .versions
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownVersion(name.to_string()))?;
        entry.public = true;
        self.public_version = Some(name.to_string());
        Ok(())
    }

    /// Returns false if the directory was already tracked.
    pub fn track(&mut self, dir: &str) -> bool {
        if self.tracked_directories.iter().any(|d| d == dir) {
            return false;
        }
        self.tracked_directories.push(dir.to_string());
        true
    }

    /// Returns false if the directory was not tracked.
    pub fn untrack(&mut self, dir: &str) -> bool {
        let before = self.tracked_directories.len();
        self.tracked_directories.retain(|d| d != dir);
        self.tracked_directories.len() != before
    }

    /// A copy pointing at a new root folder that keeps only the current
    /// version. Returns the new manifest and how many versions were dropped.
    pub fn rerooted(&self, new_folder_url: &str) -> Result<(ProjectConfig, usize), ConfigError> {
        if folder_id_from_url(new_folder_url).is_none() {
            return Err(ConfigError::InvalidFolderUrl(new_folder_url.to_string()));
        }
        let current = self
            .current_version
            .clone()
            .ok_or(ConfigError::NoCurrentVersion)?;
        let entry = self.version(&current)?.clone();

        let mut versions = IndexMap::new();
        versions.insert(current.clone(), entry);
        let public_version = self
            .public_version
            .clone()
            .filter(|p| versions.contains_key(p));

        let dropped = self.versions.len() - 1;
        Ok((
            ProjectConfig {
                drive_folder_url: new_folder_url.to_string(),
                versions,
                current_version: Some(current),
                public_version,
                tracked_directories: self.tracked_directories.clone(),
            },
            dropped,
        ))
    }

    /// Bring a freshly parsed manifest in line with the invariants. Returns
    /// true if legacy entries were rewritten.
    fn from_stored(stored: StoredConfig) -> (Self, bool) {
        let mut migrated = false;
        let versions = stored
            .versions
            .into_iter()
            .map(|(name, v)| match v {
                StoredVersion::Legacy(url) => {
                    migrated = true;
                    (name, VersionEntry::new(url, false))
                }
                StoredVersion::Entry(entry) => (name, entry),
            })
            .collect::<IndexMap<_, _>>();

        let mut config = ProjectConfig {
            drive_folder_url: stored.drive_folder_url,
            versions,
            current_version: stored.current_version,
            public_version: stored.public_version,
            tracked_directories: Vec::new(),
        };
        for dir in &stored.tracked_directories {
            config.track(dir);
        }

        if let Some(current) = &config.current_version {
            if !config.versions.contains_key(current) {
                tracing::warn!(
                    "current version '{}' is not in the versions map; clearing it",
                    current
                );
                config.current_version = None;
            }
        }
        (config, migrated)
    }
}

/// Reads and writes the manifest at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ConfigStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Where `change_folder_root` leaves the previous manifest.
    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.path, ".backup")
    }

    /// Load the manifest, migrating legacy version entries on the way.
    pub fn load(&self) -> Result<ProjectConfig, ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let stored: StoredConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Invalid {
                path: self.path.clone(),
                source,
            })?;

        let (config, migrated) = ProjectConfig::from_stored(stored);
        if migrated {
            self.save(&config)?;
            println!("Migrated config to new format with local_path support.");
        }
        Ok(config)
    }

    /// Atomically replace the manifest: write a sibling temp file, then
    /// rename it over the original.
    pub fn save(&self, config: &ProjectConfig) -> Result<(), ConfigError> {
        let tmp = with_suffix(&self.path, ".tmp");
        self.write_json(&tmp, config)?;
        fs::rename(&tmp, &self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!("saved config to {}", self.path.display());
        Ok(())
    }

    /// Write a copy of `config` next to the manifest and return its path.
    pub fn backup(&self, config: &ProjectConfig) -> Result<PathBuf, ConfigError> {
        let backup = self.backup_path();
        self.write_json(&backup, config)?;
        Ok(backup)
    }

    fn write_json(&self, path: &Path, config: &ProjectConfig) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        ConfigStore::new(CONFIG_FILE)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "https://drive.google.com/drive/folders/ROOT";

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join(CONFIG_FILE))
    }

    fn version_at(folder_id: &str, public: bool) -> VersionEntry {
        VersionEntry::new(format!("https://drive.google.com/drive/folders/{}", folder_id), public)
    }

    #[test]
    fn new_config_dedupes_tracked_directories() {
        let dirs = vec!["src".to_string(), "data".to_string(), "src".to_string()];
        let config = ProjectConfig::new(ROOT, &dirs).unwrap();
        assert_eq!(config.tracked_directories, vec!["src", "data"]);
        assert!(config.versions.is_empty());
        assert_eq!(config.current_version, None);
    }

    #[test]
    fn new_config_rejects_bad_folder_url() {
        let err = ProjectConfig::new("https://example.com/nothing", &[]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFolderUrl(_)));
    }

    #[test]
    fn save_then_load_preserves_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut config = ProjectConfig::new(ROOT, &["src".to_string()]).unwrap();
        config.record_version("v1", version_at("V1", true));

        store.save(&config).unwrap();
        assert!(!dir.path().join(".gdvc_config.json.tmp").exists());
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(store_in(&dir).load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_rejects_invalid_json_and_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(ConfigError::Invalid { .. })));

        fs::write(store.path(), r#"{"versions": {}}"#).unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("drive_folder_url"));
    }

    #[test]
    fn load_fills_optional_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            format!(r#"{{"drive_folder_url": "{}", "versions": {{}}}}"#, ROOT),
        )
        .unwrap();

        let config = store.load().unwrap();
        assert!(config.tracked_directories.is_empty());
        assert_eq!(config.current_version, None);
        assert_eq!(config.public_version, None);
    }

    #[test]
    fn load_migrates_legacy_string_versions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            format!(
                r#"{{"drive_folder_url": "{}",
                    "versions": {{"v0": "https://drive.google.com/drive/folders/OLD"}},
                    "current_version": "v0"}}"#,
                ROOT
            ),
        )
        .unwrap();

        let config = store.load().unwrap();
        let entry = config.version("v0").unwrap();
        assert_eq!(entry.local_path, ".");
        assert!(!entry.public);

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk["versions"]["v0"]["local_path"], ".");
    }

    #[test]
    fn load_clears_dangling_current_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            format!(
                r#"{{"drive_folder_url": "{}", "versions": {{}}, "current_version": "ghost",
                    "tracked_directories": ["a", "a"]}}"#,
                ROOT
            ),
        )
        .unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.current_version, None);
        assert_eq!(config.tracked_directories, vec!["a"]);
    }

    #[test]
    fn track_and_untrack_report_changes() {
        let mut config = ProjectConfig::new(ROOT, &[]).unwrap();
        assert!(config.track("models"));
        assert!(!config.track("models"));
        assert!(config.untrack("models"));
        assert!(!config.untrack("models"));
    }

    #[test]
    fn set_public_requires_known_version() {
        let mut config = ProjectConfig::new(ROOT, &[]).unwrap();
        assert!(matches!(
            config.set_public("v9"),
            Err(ConfigError::UnknownVersion(_))
        ));

        config.record_version("v1", version_at("V1", false));
        config.set_public("v1").unwrap();
        assert_eq!(config.public_version.as_deref(), Some("v1"));
        assert!(config.version("v1").unwrap().public);
    }

    #[test]
    fn rerooted_keeps_only_current_version() {
        let mut config = ProjectConfig::new(ROOT, &["src".to_string()]).unwrap();
        config.record_version("v1", version_at("V1", true));
        config.set_public("v1").unwrap();
        config.record_version("v2", version_at("V2", false));

        let (next, dropped) = config
            .rerooted("https://drive.google.com/drive/folders/NEW")
            .unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(next.versions.keys().collect::<Vec<_>>(), vec!["v2"]);
        assert_eq!(next.current_version.as_deref(), Some("v2"));
        assert_eq!(next.public_version, None);
        assert_eq!(next.tracked_directories, vec!["src"]);
        assert_eq!(next.root_folder_id().unwrap(), "NEW");
    }

    #[test]
    fn rerooted_requires_current_version() {
        let config = ProjectConfig::new(ROOT, &[]).unwrap();
        assert!(matches!(
            config.rerooted("https://drive.google.com/drive/folders/NEW"),
            Err(ConfigError::NoCurrentVersion)
        ));
    }
}
