//! Configuration stores.
//!
//! [`FileConfigStore`] reads KDL files from a state root; [`MemoryConfigStore`]
//! holds layers in memory for embedding and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tlskeeper_common::AppName;
use tracing::trace;

use crate::error::ConfigError;
use crate::layered::{ConfigScope, LayeredConfig, Settings};

/// Settings file name in the state root and in each app directory
pub const SETTINGS_FILE: &str = "settings.kdl";

/// Directory under the state root holding one directory per application
pub const APPS_DIR: &str = "apps";

/// Source of settings layers
pub trait ConfigStore: Send + Sync {
    /// Load one settings layer
    fn settings(&self, scope: &ConfigScope) -> Result<Settings, ConfigError>;

    /// Load both layers for an application
    fn layered(&self, app: &AppName) -> Result<LayeredConfig, ConfigError> {
        let global = self.settings(&ConfigScope::Global)?;
        let app = self.settings(&ConfigScope::App(app.clone()))?;
        Ok(LayeredConfig::new(global, app))
    }
}

/// Settings stored as KDL files under a state root.
///
/// ```text
/// root/
/// ├── settings.kdl          # global layer
/// └── apps/
///     └── shop/
///         └── settings.kdl  # app layer
/// ```
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    root: PathBuf,
}

impl FileConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the settings file backing a scope
    pub fn path_for(&self, scope: &ConfigScope) -> PathBuf {
        match scope {
            ConfigScope::Global => self.root.join(SETTINGS_FILE),
            ConfigScope::App(app) => self
                .root
                .join(APPS_DIR)
                .join(app.as_str())
                .join(SETTINGS_FILE),
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn settings(&self, scope: &ConfigScope) -> Result<Settings, ConfigError> {
        let path = self.path_for(scope);
        trace!(scope = %scope, path = %path.display(), "Loading settings layer");
        Settings::load(&path)
    }
}

/// Settings held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    global: Settings,
    apps: HashMap<AppName, Settings>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, settings: Settings) -> Self {
        self.global = settings;
        self
    }

    pub fn with_app(mut self, app: impl Into<AppName>, settings: Settings) -> Self {
        self.apps.insert(app.into(), settings);
        self
    }
}

impl ConfigStore for MemoryConfigStore {
    fn settings(&self, scope: &ConfigScope) -> Result<Settings, ConfigError> {
        Ok(match scope {
            ConfigScope::Global => self.global.clone(),
            ConfigScope::App(app) => self.apps.get(app).cloned().unwrap_or_default(),
        })
    }
}
