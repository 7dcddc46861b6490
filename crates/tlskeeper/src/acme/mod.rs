//! Certificate state and renewal scheduling
//!
//! Decides which applications carry a certificate produced by the ACME
//! issuer, when those certificates need renewing, and where the external
//! ACME client keeps state for each distinct request shape.
//!
//! # Architecture
//!
//! - [`IdentityMatcher`] - Compares installed and issued certificates by content digest
//! - [`ExpiryReader`] - Reads `notAfter` from PEM or DER certificates
//! - [`RenewalScheduler`] - Derives renewal windows from per-app grace periods
//! - [`RequestConfigResolver`] - Builds request parameters and selects their partition
//! - [`FleetScanner`] - Produces the renewal-status report for every managed app
//!
//! # Partitions
//!
//! Each distinct request configuration is hashed into a [`PartitionKey`].
//! The partition holds the canonical configuration text and is the directory
//! the ACME client writes into:
//!
//! ```text
//! apps/<app>/acme/certs/
//! ├── current                 # key of the active partition
//! └── <sha256>/
//!     ├── config              # canonical request arguments
//!     └── cert.pem            # written by the ACME client
//! ```
//!
//! Partitions are never deleted here; stale ones accumulate.

mod digest;
mod error;
mod expiry;
mod fleet;
mod identity;
mod report;
mod request;
mod scheduler;
mod storage;

pub use digest::{CertDigest, ContentDigest, Sha256Digest};
pub use error::{AcmeError, StorageError};
pub use expiry::{read_expiry, ExpiryReader};
pub use fleet::FleetScanner;
pub use identity::{IdentityMatcher, ManagedReason};
pub use report::{render_json, render_table, render_tsv, RenewalStatus};
pub use request::{
    contact_email, AcmeServer, RequestConfig, RequestConfigResolver, ResolvedRequest,
    DEFAULT_TOS_HASH, KEY_SIZE, PRODUCTION_DIRECTORY_URL, STAGING_DIRECTORY_URL,
};
pub use scheduler::{resolve_grace_period, RenewalScheduler, RenewalWindow, DEFAULT_GRACE_PERIOD};
pub use storage::{
    FsPartitionStore, MemoryPartitionStore, PartitionHandle, PartitionKey, PartitionStore,
    CERT_FILE, CONFIG_FILE, CURRENT_FILE,
};
