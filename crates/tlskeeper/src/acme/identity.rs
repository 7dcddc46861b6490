//! Managed certificate detection
//!
//! An installed certificate is "managed" when its bytes hash to the same
//! digest as the certificate the issuer last produced for the application.
//! File names, timestamps and metadata are never consulted.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tlskeeper_common::AppName;
use tracing::debug;

use super::digest::{CertDigest, ContentDigest};
use crate::apps::{ApplicationRegistry, CertificateStore};

/// Why an application is, or is not, managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManagedReason {
    /// TLS is not enabled for the application
    TlsDisabled,
    /// TLS is enabled but no installed certificate could be read
    NoCertificate,
    /// The installed certificate differs from the issued one, or nothing was issued
    Foreign,
    /// The installed certificate is the issued one
    Managed,
}

impl ManagedReason {
    pub fn is_managed(self) -> bool {
        self == ManagedReason::Managed
    }
}

impl fmt::Display for ManagedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ManagedReason::TlsDisabled => "tls disabled",
            ManagedReason::NoCertificate => "no certificate installed",
            ManagedReason::Foreign => "certificate not issued by acme",
            ManagedReason::Managed => "managed",
        };
        f.write_str(text)
    }
}

/// Compares installed and issued certificates by content digest
#[derive(Clone)]
pub struct IdentityMatcher {
    registry: Arc<dyn ApplicationRegistry>,
    certs: Arc<dyn CertificateStore>,
    digest: Arc<dyn ContentDigest>,
}

impl IdentityMatcher {
    pub fn new(
        registry: Arc<dyn ApplicationRegistry>,
        certs: Arc<dyn CertificateStore>,
        digest: Arc<dyn ContentDigest>,
    ) -> Self {
        Self {
            registry,
            certs,
            digest,
        }
    }

    /// Decide whether the application's installed certificate is the issued one.
    ///
    /// Never fails: unreadable files count as absent.
    pub fn check(&self, app: &AppName) -> ManagedReason {
        if !self.registry.is_tls_enabled(app) {
            debug!(app = %app, "TLS not enabled");
            return ManagedReason::TlsDisabled;
        }

        let Some(installed) = self.certs.installed_certificate(app) else {
            debug!(app = %app, "TLS enabled but no installed certificate");
            return ManagedReason::NoCertificate;
        };

        let installed = CertDigest::of(Some(installed.as_slice()), self.digest.as_ref());
        let issued = CertDigest::of(
            self.certs.issued_certificate(app).as_deref(),
            self.digest.as_ref(),
        );

        let reason = if installed.matches(&issued) {
            ManagedReason::Managed
        } else {
            ManagedReason::Foreign
        };

        debug!(
            app = %app,
            installed_digest = installed.as_str(),
            issued_digest = issued.as_str(),
            reason = %reason,
            "Compared certificate digests"
        );

        reason
    }

    pub fn is_managed(&self, app: &AppName) -> bool {
        self.check(app).is_managed()
    }
}

impl fmt::Debug for IdentityMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acme::digest::Sha256Digest;
    use crate::test_support::MemoryApps;

    /// Digest that returns its input, so equal bytes are visibly equal
    struct IdentityDigest;

    impl ContentDigest for IdentityDigest {
        fn digest(&self, bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }

    fn matcher(apps: MemoryApps, digest: Arc<dyn ContentDigest>) -> IdentityMatcher {
        let apps = Arc::new(apps);
        IdentityMatcher::new(apps.clone(), apps, digest)
    }

    #[test]
    fn test_tls_disabled() {
        let m = matcher(
            MemoryApps::new().with_app("blog", |a| a),
            Arc::new(Sha256Digest),
        );
        assert_eq!(m.check(&AppName::new("blog")), ManagedReason::TlsDisabled);
        assert!(!m.is_managed(&AppName::new("blog")));
    }

    #[test]
    fn test_tls_enabled_without_certificate() {
        let m = matcher(
            MemoryApps::new().with_app("blog", |a| a.tls(true).issued(b"D1")),
            Arc::new(Sha256Digest),
        );
        assert_eq!(m.check(&AppName::new("blog")), ManagedReason::NoCertificate);
    }

    #[test]
    fn test_matching_digests_are_managed() {
        let m = matcher(
            MemoryApps::new().with_app("shop", |a| a.installed(b"D1").issued(b"D1")),
            Arc::new(IdentityDigest),
        );
        assert_eq!(m.check(&AppName::new("shop")), ManagedReason::Managed);
        assert!(m.is_managed(&AppName::new("shop")));
    }

    #[test]
    fn test_different_certificate_is_foreign() {
        let m = matcher(
            MemoryApps::new().with_app("shop", |a| a.installed(b"D1").issued(b"D2")),
            Arc::new(Sha256Digest),
        );
        assert_eq!(m.check(&AppName::new("shop")), ManagedReason::Foreign);
    }

    #[test]
    fn test_missing_issued_certificate_is_foreign() {
        let m = matcher(
            MemoryApps::new().with_app("shop", |a| a.installed(b"D1")),
            Arc::new(Sha256Digest),
        );
        assert_eq!(m.check(&AppName::new("shop")), ManagedReason::Foreign);
    }

    #[test]
    fn test_unknown_app() {
        let m = matcher(MemoryApps::new(), Arc::new(Sha256Digest));
        assert_eq!(m.check(&AppName::new("ghost")), ManagedReason::TlsDisabled);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ManagedReason::Managed.to_string(), "managed");
        assert_eq!(ManagedReason::TlsDisabled.to_string(), "tls disabled");
    }
}
