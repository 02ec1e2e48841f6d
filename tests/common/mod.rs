//! Shared fixtures: an in-memory Drive and scratch workspaces.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use gdvc::api::{DriveError, Remote, RemoteItem, FOLDER_MIME};
use gdvc::commands::Workspace;
use gdvc::config::{ConfigStore, ProjectConfig, CONFIG_FILE};
use tempfile::TempDir;

pub const ROOT_URL: &str = "https://drive.google.com/drive/folders/ROOT";
pub const ROOT_ID: &str = "ROOT";

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: String,
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct State {
    next_id: usize,
    nodes: BTreeMap<String, Node>,
    shared: BTreeSet<String>,
    failing_uploads: BTreeSet<String>,
    denied_shares: BTreeSet<String>,
    denied_listings: BTreeSet<String>,
}

/// Drive stand-in. Clones share state, so a test can hand one to a
/// command and inspect the other afterwards.
#[derive(Clone, Default)]
pub struct FakeDrive {
    state: Rc<RefCell<State>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        FakeDrive::default()
    }

    fn insert(&self, parent: &str, name: &str, mime_type: &str, content: Vec<u8>) -> String {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = format!("id{}", state.next_id);
        state.nodes.insert(
            id.clone(),
            Node {
                parent: parent.to_string(),
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                content,
            },
        );
        id
    }

    pub fn add_folder(&self, parent: &str, name: &str) -> String {
        self.insert(parent, name, FOLDER_MIME, Vec::new())
    }

    pub fn add_file(&self, parent: &str, name: &str, content: &str) -> String {
        self.insert(parent, name, "text/plain", content.as_bytes().to_vec())
    }

    pub fn add_google_doc(&self, parent: &str, name: &str) -> String {
        self.insert(parent, name, "application/vnd.google-apps.document", Vec::new())
    }

    pub fn fail_upload_of(&self, name: &str) {
        self.state.borrow_mut().failing_uploads.insert(name.to_string());
    }

    pub fn deny_share(&self, id: &str) {
        self.state.borrow_mut().denied_shares.insert(id.to_string());
    }

    pub fn deny_listing(&self, id: &str) {
        self.state.borrow_mut().denied_listings.insert(id.to_string());
    }

    /// Children of `parent` as `(id, node)`, sorted by name.
    pub fn children(&self, parent: &str) -> Vec<(String, Node)> {
        let state = self.state.borrow();
        let mut children: Vec<_> = state
            .nodes
            .iter()
            .filter(|(_, n)| n.parent == parent)
            .map(|(id, n)| (id.clone(), n.clone()))
            .collect();
        children.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        children
    }

    pub fn child_named(&self, parent: &str, name: &str) -> Option<(String, Node)> {
        self.children(parent).into_iter().find(|(_, n)| n.name == name)
    }

    pub fn is_shared(&self, id: &str) -> bool {
        self.state.borrow().shared.contains(id)
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.state.borrow().nodes.keys().cloned().collect()
    }
}

impl Remote for FakeDrive {
    fn find_folder(&self, parent: &str, name: &str) -> Result<Option<String>, DriveError> {
        Ok(self
            .children(parent)
            .into_iter()
            .find(|(_, n)| n.name == name && n.mime_type == FOLDER_MIME)
            .map(|(id, _)| id))
    }

    fn create_folder(&self, parent: &str, name: &str) -> Result<String, DriveError> {
        Ok(self.add_folder(parent, name))
    }

    fn upload_file(&self, parent: &str, name: &str, path: &Path) -> Result<String, DriveError> {
        if self.state.borrow().failing_uploads.contains(name) {
            return Err(DriveError::Unexpected(format!("upload of {} rejected", name)));
        }
        let content = fs::read(path).map_err(|source| DriveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.insert(parent, name, "application/octet-stream", content))
    }

    fn share_publicly(&self, id: &str) -> Result<(), DriveError> {
        let mut state = self.state.borrow_mut();
        if state.denied_shares.contains(id) {
            return Err(DriveError::Forbidden(format!("cannot share {}", id)));
        }
        state.shared.insert(id.to_string());
        Ok(())
    }

    fn list_children(&self, folder: &str) -> Result<Vec<RemoteItem>, DriveError> {
        if self.state.borrow().denied_listings.contains(folder) {
            return Err(DriveError::Forbidden(format!("cannot list {}", folder)));
        }
        Ok(self
            .children(folder)
            .into_iter()
            .map(|(id, n)| RemoteItem {
                id,
                name: n.name,
                mime_type: n.mime_type,
            })
            .collect())
    }

    fn download_file(&self, id: &str, dest: &Path) -> Result<(), DriveError> {
        let content = self
            .state
            .borrow()
            .nodes
            .get(id)
            .map(|n| n.content.clone())
            .ok_or_else(|| DriveError::NotFound(id.to_string()))?;
        fs::write(dest, content).map_err(|source| DriveError::Io {
            path: dest.to_path_buf(),
            source,
        })
    }
}

/// A workspace whose manifest lives in `dir` and whose prompts auto-accept.
pub fn workspace(dir: &TempDir) -> Workspace {
    Workspace::new(ConfigStore::new(dir.path().join(CONFIG_FILE)), true)
}

/// Write a fresh manifest rooted at [`ROOT_URL`] and return it.
pub fn seed(ws: &Workspace, tracked: &[String]) -> ProjectConfig {
    let config = ProjectConfig::new(ROOT_URL, tracked).unwrap();
    ws.store.save(&config).unwrap();
    config
}

/// A `connect` closure for paths that must not reach Drive.
pub fn no_connect() -> anyhow::Result<FakeDrive> {
    panic!("command should not have connected to Drive")
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
