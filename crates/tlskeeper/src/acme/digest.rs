//! Content digests.
//!
//! Certificate identity and partition keys both come from hashing bytes.
//! The hash function sits behind [`ContentDigest`] so tests can substitute
//! a predictable one.

use sha2::{Digest, Sha256};

/// Hash function producing a hex string
pub trait ContentDigest: Send + Sync {
    fn digest(&self, bytes: &[u8]) -> String;
}

/// SHA-256, lowercase hex
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl ContentDigest for Sha256Digest {
    fn digest(&self, bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }
}

/// Digest of a file that may not exist.
///
/// `NotFound` never matches anything, not even another `NotFound`, so two
/// missing certificates are never mistaken for the same issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertDigest {
    Present(String),
    NotFound,
}

impl CertDigest {
    pub fn of(bytes: Option<&[u8]>, digest: &dyn ContentDigest) -> Self {
        match bytes {
            Some(bytes) => Self::Present(digest.digest(bytes)),
            None => Self::NotFound,
        }
    }

    /// True only when both sides are present and equal
    pub fn matches(&self, other: &CertDigest) -> bool {
        match (self, other) {
            (Self::Present(a), Self::Present(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Present(hex) => hex,
            Self::NotFound => "not_found",
        }
    }
}
