//! tlskeeper library
//!
//! Certificate state and renewal scheduling for applications whose TLS
//! certificates are issued by an external ACME client.
//!
//! - **Identity**: an installed certificate is managed when its content digest
//!   equals that of the issued certificate
//! - **Timing**: renewal is due a grace period (default 30 days) before expiry
//! - **Partitions**: each distinct request configuration gets its own state
//!   directory, keyed by the SHA-256 of its canonical arguments
//!
//! # Example
//!
//! ```ignore
//! use tlskeeper::Keeper;
//!
//! let keeper = Keeper::open("/var/lib/tlskeeper");
//! for row in keeper.scanner().scan()? {
//!     println!("{}", row.tsv_line());
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tlskeeper_config::FileConfigStore;

// ============================================================================
// Module Declarations
// ============================================================================

pub mod acme;
pub mod apps;

#[cfg(test)]
mod test_support;

// ============================================================================
// Public API Re-exports
// ============================================================================

pub use acme::{
    AcmeError, FleetScanner, IdentityMatcher, ManagedReason, RenewalStatus, RequestConfig,
    RequestConfigResolver, ResolvedRequest,
};
pub use apps::{ApplicationRegistry, CertificateStore, FsApps};
pub use tlskeeper_common::{format_duration, AppName, SignedDuration};

use acme::{ExpiryReader, FsPartitionStore, RenewalScheduler, Sha256Digest};

/// Components wired over one state root on the local filesystem
#[derive(Debug, Clone)]
pub struct Keeper {
    root: PathBuf,
    matcher: IdentityMatcher,
    scanner: FleetScanner,
    resolver: RequestConfigResolver,
}

impl Keeper {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let apps = Arc::new(FsApps::new(&root));
        let config = Arc::new(FileConfigStore::new(&root));
        let digest = Arc::new(Sha256Digest);

        let matcher = IdentityMatcher::new(apps.clone(), apps.clone(), digest.clone());
        let scanner = FleetScanner::new(
            apps.clone(),
            matcher.clone(),
            ExpiryReader::new(apps.clone()),
            RenewalScheduler::new(config.clone()),
        );
        let resolver = RequestConfigResolver::new(
            config,
            apps,
            Arc::new(FsPartitionStore::new(&root)),
            digest,
        );

        Self {
            root,
            matcher,
            scanner,
            resolver,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn matcher(&self) -> &IdentityMatcher {
        &self.matcher
    }

    pub fn scanner(&self) -> &FleetScanner {
        &self.scanner
    }

    pub fn resolver(&self) -> &RequestConfigResolver {
        &self.resolver
    }
}
