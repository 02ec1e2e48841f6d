// One module per subcommand. Commands that talk to Drive take a `connect`
// closure instead of a client so local validation runs (and can fail)
// before any authentication happens.

pub mod change_root;
pub mod download;
pub mod init;
pub mod publish;
pub mod track;
pub mod update;
pub mod upload;

use anyhow::Result;

use crate::config::{ConfigStore, ProjectConfig};

/// Where the manifest lives and how prompts are answered.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub store: ConfigStore,
    pub assume_yes: bool,
}

impl Workspace {
    pub fn new(store: ConfigStore, assume_yes: bool) -> Self {
        Workspace { store, assume_yes }
    }

    pub fn load(&self) -> Result<ProjectConfig> {
        Ok(self.store.load()?)
    }

    pub fn save(&self, config: &ProjectConfig) -> Result<()> {
        Ok(self.store.save(config)?)
    }
}
