//! In-memory collaborators and certificate fixtures for unit tests.

use tlskeeper_common::AppName;

use crate::acme::AcmeError;
use crate::apps::{ApplicationRegistry, CertificateStore};

/// `notAfter` of every fixture certificate: 2030-01-01T00:00:00Z
pub(crate) const EXPIRY_2030: i64 = 1_893_456_000;

/// `notAfter` of [`self_signed_until`] with 2035-01-01
pub(crate) const EXPIRY_2035: i64 = 2_051_222_400;

/// Self-signed certificate for `domain` expiring at [`EXPIRY_2030`], as (PEM, DER)
pub(crate) fn self_signed(domain: &str) -> (String, Vec<u8>) {
    self_signed_until(domain, 2030)
}

/// Self-signed certificate for `domain` expiring on January 1st of `year`
pub(crate) fn self_signed_until(domain: &str, year: i32) -> (String, Vec<u8>) {
    let mut params = rcgen::CertificateParams::new(vec![domain.to_string()]).unwrap();
    params.not_after = rcgen::date_time_ymd(year, 1, 1);
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    (cert.pem(), cert.der().to_vec())
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AppFixture {
    tls: bool,
    domains: Vec<String>,
    installed: Option<Vec<u8>>,
    issued: Option<Vec<u8>>,
}

impl AppFixture {
    /// Install a certificate and enable TLS
    pub(crate) fn installed(mut self, bytes: &[u8]) -> Self {
        self.installed = Some(bytes.to_vec());
        self.tls = true;
        self
    }

    pub(crate) fn issued(mut self, bytes: &[u8]) -> Self {
        self.issued = Some(bytes.to_vec());
        self
    }

    pub(crate) fn tls(mut self, enabled: bool) -> Self {
        self.tls = enabled;
        self
    }

    pub(crate) fn domains(mut self, domains: &[&str]) -> Self {
        self.domains = domains.iter().map(|d| d.to_string()).collect();
        self
    }
}

/// Registry and certificate store over a fixed list of apps, in insertion order
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryApps {
    apps: Vec<(AppName, AppFixture)>,
}

impl MemoryApps {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_app(
        mut self,
        name: &str,
        build: impl FnOnce(AppFixture) -> AppFixture,
    ) -> Self {
        self.apps
            .push((AppName::new(name), build(AppFixture::default())));
        self
    }

    fn fixture(&self, app: &AppName) -> Option<&AppFixture> {
        self.apps.iter().find(|(name, _)| name == app).map(|(_, f)| f)
    }
}

impl ApplicationRegistry for MemoryApps {
    fn list_applications(&self) -> Result<Vec<AppName>, AcmeError> {
        Ok(self.apps.iter().map(|(name, _)| name.clone()).collect())
    }

    fn list_domains(&self, app: &AppName) -> Result<Vec<String>, AcmeError> {
        Ok(self
            .fixture(app)
            .map(|f| f.domains.clone())
            .unwrap_or_default())
    }

    fn is_tls_enabled(&self, app: &AppName) -> bool {
        self.fixture(app).is_some_and(|f| f.tls)
    }
}

impl CertificateStore for MemoryApps {
    fn installed_certificate(&self, app: &AppName) -> Option<Vec<u8>> {
        self.fixture(app).and_then(|f| f.installed.clone())
    }

    fn issued_certificate(&self, app: &AppName) -> Option<Vec<u8>> {
        self.fixture(app).and_then(|f| f.issued.clone())
    }
}
