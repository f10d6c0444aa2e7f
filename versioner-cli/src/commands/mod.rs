//! Command handlers. Each one composes the core engines for a single
//! operation and runs synchronously on a blocking worker.

pub mod auto_restore;
pub mod config;
pub mod mirror;
pub mod remote;
pub mod setup;
pub mod snapshot;
pub mod versions;

use crate::error::CliError;
use crate::models::settings::SettingsStore;
use crate::prompt::Prompter;
use std::path::PathBuf;
use std::sync::Arc;
use versioner_core::remote::RemoteSyncClient;
use versioner_core::workspace::init_versions_dir;
use versioner_core::{ProgressSink, ProjectConfig, VersionCatalog};

/// Everything a command needs, assembled once per invocation
pub struct Context {
    pub workspace_root: PathBuf,
    pub settings: SettingsStore,
    pub prompter: Box<dyn Prompter>,
    pub progress: Arc<dyn ProgressSink>,
}

impl Context {
    /// Effective configuration, loaded fresh for each operation.
    pub fn config(&self) -> ProjectConfig {
        ProjectConfig::load(&self.workspace_root, &self.settings)
    }

    pub fn catalog(&self, config: &ProjectConfig) -> VersionCatalog {
        VersionCatalog::new(config.versions_dir(&self.workspace_root))
    }

    /// Catalog whose store directory is guaranteed to exist.
    pub fn ensure_catalog(&self, config: &ProjectConfig) -> anyhow::Result<VersionCatalog> {
        let catalog = self.catalog(config);
        init_versions_dir(catalog.versions_dir())?;
        Ok(catalog)
    }

    pub fn remote_client(&self, config: &ProjectConfig) -> anyhow::Result<RemoteSyncClient> {
        let profile = config.remote.as_ref().ok_or(CliError::RemoteNotConfigured)?;
        Ok(RemoteSyncClient::new(profile))
    }
}
