use std::env;
use std::path::Path;
use tempfile::TempDir;

/// Points `GIGCHAT_HOME` at a temp workspace so config and journal writes
/// stay isolated.
pub struct IntegrationHarness {
    workspace: TempDir,
}

impl IntegrationHarness {
    pub fn new() -> Self {
        let workspace = TempDir::new().expect("failed to create temp workspace");
        env::set_var("GIGCHAT_HOME", workspace.path());
        Self { workspace }
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }
}

mod intent_router_failure;
mod participation_flow;
mod sync_flow;
