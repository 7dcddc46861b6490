//! Certificate expiry
//!
//! Reads the `notAfter` field of the leaf certificate. Only the first
//! certificate of a chain is considered; intermediates usually outlive it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tlskeeper_common::AppName;
use tracing::trace;

use super::error::AcmeError;
use crate::apps::CertificateStore;

const PEM_MARKER: &[u8] = b"-----BEGIN";

/// Parse a PEM or DER certificate and return its expiry
pub fn read_expiry(certificate: &[u8]) -> Result<DateTime<Utc>, AcmeError> {
    let not_after = if is_pem(certificate) {
        let (_, pem) = x509_parser::pem::parse_x509_pem(certificate)
            .map_err(|e| AcmeError::CertificateParse(format!("failed to parse PEM: {:?}", e)))?;
        let cert = pem
            .parse_x509()
            .map_err(|e| AcmeError::CertificateParse(format!("failed to parse X509: {:?}", e)))?;
        cert.validity().not_after.timestamp()
    } else {
        let (_, cert) = x509_parser::parse_x509_certificate(certificate)
            .map_err(|e| AcmeError::CertificateParse(format!("failed to parse DER: {:?}", e)))?;
        cert.validity().not_after.timestamp()
    };

    DateTime::from_timestamp(not_after, 0).ok_or_else(|| {
        AcmeError::CertificateParse(format!("notAfter {} is out of range", not_after))
    })
}

fn is_pem(bytes: &[u8]) -> bool {
    bytes.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER)
}

/// Reads the expiry of an application's installed certificate
#[derive(Clone)]
pub struct ExpiryReader {
    certs: Arc<dyn CertificateStore>,
}

impl ExpiryReader {
    pub fn new(certs: Arc<dyn CertificateStore>) -> Self {
        Self { certs }
    }

    /// Expiry of the installed certificate.
    ///
    /// Fails with `CertificateMissing` when nothing is installed and
    /// `CertificateParse` when the bytes are not a certificate.
    pub fn installed_expiry(&self, app: &AppName) -> Result<DateTime<Utc>, AcmeError> {
        let certificate = self
            .certs
            .installed_certificate(app)
            .ok_or_else(|| AcmeError::CertificateMissing { app: app.clone() })?;

        let expiry = read_expiry(&certificate)?;
        trace!(app = %app, expiry = %expiry, "Read certificate expiry");
        Ok(expiry)
    }
}

impl std::fmt::Debug for ExpiryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryReader").finish_non_exhaustive()
    }
}
