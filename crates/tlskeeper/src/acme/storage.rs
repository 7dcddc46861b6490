//! Partition storage for ACME issuance state
//!
//! Each distinct request configuration gets its own partition, keyed by the
//! digest of the configuration text. The external ACME client keeps its
//! account key and certificates inside the partition, so two requests with
//! different parameters never share issuance state.
//!
//! # Directory Structure
//!
//! ```text
//! root/apps/<app>/acme/certs/
//! ├── current               # digest of the active partition
//! └── <digest>/
//!     ├── config            # canonical request text
//!     └── cert.pem          # written by the ACME client
//! ```
//!
//! Partitions are never deleted.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tlskeeper_common::AppName;
use tlskeeper_config::APPS_DIR;
use tracing::{debug, info, trace};

use super::error::StorageError;

/// Canonical request text inside a partition
pub const CONFIG_FILE: &str = "config";

/// Certificate written by the ACME client inside a partition
pub const CERT_FILE: &str = "cert.pem";

/// Pointer file naming the active partition
pub const CURRENT_FILE: &str = "current";

/// Partition key: hex digest of a canonical request configuration
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved partition, handed to the issuance pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionHandle {
    app: AppName,
    key: PartitionKey,
    path: PathBuf,
}

impl PartitionHandle {
    pub fn app(&self) -> &AppName {
        &self.app
    }

    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// Directory the ACME client should use for this partition
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Content-addressed store of request configurations, one namespace per app
pub trait PartitionStore: Send + Sync {
    /// Create the partition if needed and (re)write its config text
    fn ensure(
        &self,
        app: &AppName,
        key: &PartitionKey,
        config_text: &str,
    ) -> Result<PartitionHandle, StorageError>;

    /// Config text of a partition, if it exists
    fn load(&self, app: &AppName, key: &PartitionKey) -> Result<Option<String>, StorageError>;

    /// Every partition of an application, sorted
    fn list(&self, app: &AppName) -> Result<Vec<PartitionKey>, StorageError>;

    /// Mark a partition as the one holding the current certificate
    fn activate(&self, app: &AppName, key: &PartitionKey) -> Result<(), StorageError>;

    /// The active partition, if any
    fn active(&self, app: &AppName) -> Result<Option<PartitionKey>, StorageError>;
}

// =========================================================================
// Filesystem store
// =========================================================================

/// Partition store on the local filesystem.
///
/// Concurrent `ensure` calls for the same key race on the config file;
/// the content is identical per key, so the last writer wins harmlessly.
#[derive(Debug, Clone)]
pub struct FsPartitionStore {
    root: PathBuf,
}

impl FsPartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn certs_dir(&self, app: &AppName) -> PathBuf {
        self.root
            .join(APPS_DIR)
            .join(app.as_str())
            .join("acme")
            .join("certs")
    }

    pub fn partition_path(&self, app: &AppName, key: &PartitionKey) -> PathBuf {
        self.certs_dir(app).join(key.as_str())
    }

    /// Where the ACME client writes the partition's certificate
    pub fn certificate_path(&self, app: &AppName, key: &PartitionKey) -> PathBuf {
        self.partition_path(app, key).join(CERT_FILE)
    }
}

impl PartitionStore for FsPartitionStore {
    fn ensure(
        &self,
        app: &AppName,
        key: &PartitionKey,
        config_text: &str,
    ) -> Result<PartitionHandle, StorageError> {
        let path = self.partition_path(app, key);
        let created = !path.is_dir();

        fs::create_dir_all(&path).map_err(|e| StorageError::io(&path, e))?;

        // Account keys land in here; keep it private on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            let certs_dir = self.certs_dir(app);
            fs::set_permissions(&certs_dir, perms.clone())
                .map_err(|e| StorageError::io(&certs_dir, e))?;
            fs::set_permissions(&path, perms).map_err(|e| StorageError::io(&path, e))?;
        }

        let config_path = path.join(CONFIG_FILE);
        fs::write(&config_path, config_text).map_err(|e| StorageError::io(&config_path, e))?;

        if created {
            info!(
                app = %app,
                partition = %key,
                path = %path.display(),
                "Created ACME config partition"
            );
        } else {
            debug!(app = %app, partition = %key, "Reusing ACME config partition");
        }

        Ok(PartitionHandle {
            app: app.clone(),
            key: key.clone(),
            path,
        })
    }

    fn load(&self, app: &AppName, key: &PartitionKey) -> Result<Option<String>, StorageError> {
        let config_path = self.partition_path(app, key).join(CONFIG_FILE);

        match fs::read_to_string(&config_path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(app = %app, partition = %key, "No stored partition found");
                Ok(None)
            }
            Err(e) => Err(StorageError::io(config_path, e)),
        }
    }

    fn list(&self, app: &AppName) -> Result<Vec<PartitionKey>, StorageError> {
        let certs_dir = self.certs_dir(app);

        if !certs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&certs_dir).map_err(|e| StorageError::io(&certs_dir, e))? {
            let entry = entry.map_err(|e| StorageError::io(&certs_dir, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| StorageError::io(entry.path(), e))?
                .is_dir();
            if is_dir {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(PartitionKey::new(name));
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn activate(&self, app: &AppName, key: &PartitionKey) -> Result<(), StorageError> {
        if !self.partition_path(app, key).is_dir() {
            return Err(StorageError::UnknownPartition {
                app: app.clone(),
                key: key.clone(),
            });
        }

        // Write-then-rename so readers never see a half-written pointer
        let certs_dir = self.certs_dir(app);
        let current = certs_dir.join(CURRENT_FILE);
        let staging = certs_dir.join(format!(".{}.tmp", CURRENT_FILE));
        fs::write(&staging, format!("{}\n", key)).map_err(|e| StorageError::io(&staging, e))?;
        fs::rename(&staging, &current).map_err(|e| StorageError::io(&current, e))?;

        info!(app = %app, partition = %key, "Activated ACME config partition");
        Ok(())
    }

    fn active(&self, app: &AppName) -> Result<Option<PartitionKey>, StorageError> {
        let current = self.certs_dir(app).join(CURRENT_FILE);

        match fs::read_to_string(&current) {
            Ok(text) => {
                let key = text.trim();
                Ok((!key.is_empty()).then(|| PartitionKey::new(key)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(current, e)),
        }
    }
}

// =========================================================================
// In-memory store
// =========================================================================

#[derive(Debug, Default)]
struct AppPartitions {
    configs: BTreeMap<PartitionKey, String>,
    active: Option<PartitionKey>,
}

/// Partition store held in memory.
///
/// Handle paths are virtual (`memory/<app>/<digest>`) and do not exist on disk.
#[derive(Debug, Default)]
pub struct MemoryPartitionStore {
    apps: RwLock<HashMap<AppName, AppPartitions>>,
}

impl MemoryPartitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartitionStore for MemoryPartitionStore {
    fn ensure(
        &self,
        app: &AppName,
        key: &PartitionKey,
        config_text: &str,
    ) -> Result<PartitionHandle, StorageError> {
        let mut apps = self.apps.write();
        apps.entry(app.clone())
            .or_default()
            .configs
            .insert(key.clone(), config_text.to_string());

        Ok(PartitionHandle {
            app: app.clone(),
            key: key.clone(),
            path: PathBuf::from("memory").join(app.as_str()).join(key.as_str()),
        })
    }

    fn load(&self, app: &AppName, key: &PartitionKey) -> Result<Option<String>, StorageError> {
        Ok(self
            .apps
            .read()
            .get(app)
            .and_then(|p| p.configs.get(key).cloned()))
    }

    fn list(&self, app: &AppName) -> Result<Vec<PartitionKey>, StorageError> {
        Ok(self
            .apps
            .read()
            .get(app)
            .map(|p| p.configs.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn activate(&self, app: &AppName, key: &PartitionKey) -> Result<(), StorageError> {
        let mut apps = self.apps.write();
        match apps.get_mut(app) {
            Some(partitions) if partitions.configs.contains_key(key) => {
                partitions.active = Some(key.clone());
                Ok(())
            }
            _ => Err(StorageError::UnknownPartition {
                app: app.clone(),
                key: key.clone(),
            }),
        }
    }

    fn active(&self, app: &AppName) -> Result<Option<PartitionKey>, StorageError> {
        Ok(self.apps.read().get(app).and_then(|p| p.active.clone()))
    }
}
