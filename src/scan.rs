// Local tree inspection done before anything touches the network: which
// files would be uploaded and which of them look like secrets.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Substrings that mark a path as likely holding credentials or keys.
pub const SENSITIVE_PATTERNS: &[&str] = &[
    ".env",
    ".key",
    ".pem",
    ".p12",
    ".pfx",
    ".crt",
    ".cer",
    "credentials",
    "secret",
    "token",
    "password",
    "config.json",
    ".ssh/",
    "id_rsa",
    "id_ed25519",
    ".git/config",
    "settings.ini",
];

/// Case-insensitive substring match against [`SENSITIVE_PATTERNS`]. Path
/// separators are normalized to `/` first.
pub fn is_sensitive(path: &Path) -> bool {
    let normalized = path.to_string_lossy().replace('\\', "/").to_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| normalized.contains(p))
}

/// Every regular file under `root`, in a stable order. Symlinks are
/// followed, matching what the uploader sends.
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// What an upload of one or more local trees would contain.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadScan {
    pub files: Vec<PathBuf>,
    pub sensitive: Vec<PathBuf>,
}

impl UploadScan {
    pub fn of(roots: &[PathBuf]) -> Self {
        let mut scan = UploadScan::default();
        for root in roots {
            scan.add(root);
        }
        scan
    }

    pub fn add(&mut self, root: &Path) {
        for file in list_files(root) {
            if is_sensitive(&file) {
                self.sensitive.push(file.clone());
            }
            self.files.push(file);
        }
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn has_sensitive(&self) -> bool {
        !self.sensitive.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn matches_patterns_case_insensitively() {
        assert!(is_sensitive(Path::new("app/.ENV")));
        assert!(is_sensitive(Path::new("keys/Server.PEM")));
        assert!(is_sensitive(Path::new("home/.ssh/known_hosts")));
        assert!(is_sensitive(Path::new("deploy\\my_Secret.txt")));
        assert!(!is_sensitive(Path::new("src/main.rs")));
        assert!(!is_sensitive(Path::new("data/train.csv")));
    }

    #[test]
    fn scan_counts_files_and_flags_sensitive_ones() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("readme.md"), "hi").unwrap();
        fs::write(root.join("nested/api_token.txt"), "t").unwrap();
        fs::write(root.join("nested/data.csv"), "1,2").unwrap();

        let scan = UploadScan::of(&[root.clone()]);
        assert_eq!(scan.total(), 3);
        assert_eq!(scan.sensitive, vec![root.join("nested/api_token.txt")]);
        assert!(scan.has_sensitive());
    }

    #[cfg(unix)]
    #[test]
    fn scan_follows_symlinked_directories() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        let root = dir.path().join("proj");
        fs::create_dir_all(&outside).unwrap();
        fs::create_dir_all(&root).unwrap();
        fs::write(outside.join("secret.txt"), "s").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("linked")).unwrap();

        let scan = UploadScan::of(&[root.clone()]);
        assert_eq!(scan.files, vec![root.join("linked/secret.txt")]);
        assert_eq!(scan.sensitive, scan.files);
    }

    #[test]
    fn empty_directory_has_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let scan = UploadScan::of(&[dir.path().to_path_buf()]);
        assert_eq!(scan.total(), 0);
        assert!(!scan.has_sensitive());
    }
}
