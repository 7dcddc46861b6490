//! Applications and their certificates.
//!
//! [`ApplicationRegistry`] enumerates applications and their domains;
//! [`CertificateStore`] hands out certificate bytes. [`FsApps`] implements
//! both over the state root:
//!
//! ```text
//! root/apps/<app>/
//! ├── settings.kdl                    # app settings, including `domains`
//! ├── tls/
//! │   ├── server.crt                  # installed certificate
//! │   └── server.key
//! └── acme/certs/
//!     ├── current                     # digest of the active partition
//!     └── <digest>/cert.pem           # certificate written by the ACME client
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tlskeeper_common::AppName;
use tlskeeper_config::{ConfigScope, ConfigStore, FileConfigStore, APPS_DIR};
use tracing::{trace, warn};

use crate::acme::{AcmeError, FsPartitionStore, PartitionStore};

/// Installed certificate file inside an app's TLS directory
pub const INSTALLED_CERT_FILE: &str = "server.crt";

/// Installed private key file inside an app's TLS directory
pub const INSTALLED_KEY_FILE: &str = "server.key";

/// Enumerates applications
pub trait ApplicationRegistry: Send + Sync {
    /// Every known application, in enumeration order
    fn list_applications(&self) -> Result<Vec<AppName>, AcmeError>;

    /// The application's domains, in enumeration order
    fn list_domains(&self, app: &AppName) -> Result<Vec<String>, AcmeError>;

    fn is_tls_enabled(&self, app: &AppName) -> bool;
}

/// Read-only access to certificate bytes.
///
/// Unreadable files read as absent.
pub trait CertificateStore: Send + Sync {
    /// The certificate currently installed for the application
    fn installed_certificate(&self, app: &AppName) -> Option<Vec<u8>>;

    /// The certificate most recently produced by the issuer for the application
    fn issued_certificate(&self, app: &AppName) -> Option<Vec<u8>>;
}

/// Filesystem-backed registry and certificate store
#[derive(Debug, Clone)]
pub struct FsApps {
    root: PathBuf,
    config: FileConfigStore,
    partitions: FsPartitionStore,
}

impl FsApps {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config: FileConfigStore::new(&root),
            partitions: FsPartitionStore::new(&root),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn apps_dir(&self) -> PathBuf {
        self.root.join(APPS_DIR)
    }

    fn tls_dir(&self, app: &AppName) -> PathBuf {
        self.apps_dir().join(app.as_str()).join("tls")
    }
}

impl ApplicationRegistry for FsApps {
    fn list_applications(&self) -> Result<Vec<AppName>, AcmeError> {
        let apps_dir = self.apps_dir();

        let entries = match fs::read_dir(&apps_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %apps_dir.display(), "No apps directory");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AcmeError::RegistryUnavailable(format!(
                    "{}: {}",
                    apps_dir.display(),
                    e
                )))
            }
        };

        let mut apps = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                AcmeError::RegistryUnavailable(format!("{}: {}", apps_dir.display(), e))
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) if !name.starts_with('.') => apps.push(AppName::new(name)),
                Some(_) => {}
                None => warn!(path = %entry.path().display(), "Skipping non-UTF-8 app directory"),
            }
        }

        // read_dir order is platform-dependent
        apps.sort();
        Ok(apps)
    }

    fn list_domains(&self, app: &AppName) -> Result<Vec<String>, AcmeError> {
        let settings = self.config.settings(&ConfigScope::App(app.clone()))?;
        Ok(settings.domains().to_vec())
    }

    fn is_tls_enabled(&self, app: &AppName) -> bool {
        let tls_dir = self.tls_dir(app);
        tls_dir.join(INSTALLED_CERT_FILE).is_file() && tls_dir.join(INSTALLED_KEY_FILE).is_file()
    }
}

impl CertificateStore for FsApps {
    fn installed_certificate(&self, app: &AppName) -> Option<Vec<u8>> {
        read_optional(&self.tls_dir(app).join(INSTALLED_CERT_FILE))
    }

    fn issued_certificate(&self, app: &AppName) -> Option<Vec<u8>> {
        let key = match self.partitions.active(app) {
            Ok(Some(key)) => key,
            Ok(None) => {
                trace!(app = %app, "No active partition");
                return None;
            }
            Err(e) => {
                warn!(app = %app, error = %e, "Failed to read active partition");
                return None;
            }
        };
        read_optional(&self.partitions.certificate_path(app, &key))
    }
}

/// Read a file, treating any failure as absence
fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            trace!(path = %path.display(), "Certificate file not found");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Certificate file unreadable");
            None
        }
    }
}
