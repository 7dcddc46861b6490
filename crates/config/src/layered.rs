//! Global and per-application settings layers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use tlskeeper_common::AppName;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::kdl::parse_settings;

/// Which layer a settings lookup targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigScope {
    /// Shared by every application
    Global,
    /// Overrides the global layer for one application
    App(AppName),
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Global => write!(f, "global"),
            ConfigScope::App(app) => write!(f, "app '{}'", app),
        }
    }
}

/// One layer of settings.
///
/// Values are kept as strings regardless of how they were written; callers
/// parse what they need. Empty values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
    domains: Vec<String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(values: BTreeMap<String, String>, domains: Vec<String>) -> Self {
        Self { values, domains }
    }

    /// Parse settings from KDL text
    pub fn from_kdl(text: &str) -> Result<Self, ConfigError> {
        parse_settings(text, "<inline>")
    }

    /// Load settings from a KDL file.
    ///
    /// A missing file is an empty layer. Any other read failure, or a
    /// document that does not parse, is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "No settings file, using empty layer");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings = parse_settings(&text, &path.display().to_string())?;
        debug!(
            path = %path.display(),
            setting_count = settings.values.len(),
            "Loaded settings"
        );
        Ok(settings)
    }

    /// Set a value, replacing any previous one
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Replace the domain list
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Look up a key in this layer only
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Domains in the order they were listed
    pub fn domains(&self) -> &[String] {
        &self.domains
    }
}

/// Two-level lookup: the app layer wins, the global layer fills the gaps.
pub fn resolve<'a>(global: &'a Settings, app: &'a Settings, key: &str) -> Option<&'a str> {
    app.get(key).or_else(|| global.get(key))
}

/// Both settings layers for one application
#[derive(Debug, Clone, Default)]
pub struct LayeredConfig {
    global: Settings,
    app: Settings,
}

impl LayeredConfig {
    pub fn new(global: Settings, app: Settings) -> Self {
        Self { global, app }
    }

    /// Resolve a key, app layer first
    pub fn get(&self, key: &str) -> Option<&str> {
        resolve(&self.global, &self.app, key)
    }

    /// Look up a key in a single layer
    pub fn get_scoped(&self, scope: &ConfigScope, key: &str) -> Option<&str> {
        match scope {
            ConfigScope::Global => self.global.get(key),
            ConfigScope::App(_) => self.app.get(key),
        }
    }
}
