//! Fleet-wide renewal scan
//!
//! Walks every application, keeps the managed ones and reports their renewal
//! windows. A failure for one application drops that application from the
//! report and never aborts the scan.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tlskeeper_common::AppName;
use tracing::{debug, warn};

use super::error::AcmeError;
use super::expiry::ExpiryReader;
use super::identity::IdentityMatcher;
use super::report::RenewalStatus;
use super::scheduler::RenewalScheduler;
use crate::apps::ApplicationRegistry;

/// Coordinates identity matching, expiry reading and renewal timing
#[derive(Clone)]
pub struct FleetScanner {
    registry: Arc<dyn ApplicationRegistry>,
    matcher: IdentityMatcher,
    expiry: ExpiryReader,
    scheduler: RenewalScheduler,
}

impl FleetScanner {
    pub fn new(
        registry: Arc<dyn ApplicationRegistry>,
        matcher: IdentityMatcher,
        expiry: ExpiryReader,
        scheduler: RenewalScheduler,
    ) -> Self {
        Self {
            registry,
            matcher,
            expiry,
            scheduler,
        }
    }

    /// Scan against the wall clock
    pub fn scan(&self) -> Result<impl Iterator<Item = RenewalStatus> + '_, AcmeError> {
        self.scan_at(Utc::now())
    }

    /// Scan at a fixed point in time.
    ///
    /// Only listing the applications can fail. Rows are produced lazily in
    /// enumeration order; calling again re-reads current state.
    pub fn scan_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<impl Iterator<Item = RenewalStatus> + '_, AcmeError> {
        let apps = self.registry.list_applications()?;
        debug!(app_count = apps.len(), "Scanning applications");
        Ok(apps.into_iter().filter_map(move |app| self.scan_app(app, now)))
    }

    /// Managed applications whose renewal is due at `now`
    pub fn due_for_renewal(
        &self,
        now: DateTime<Utc>,
    ) -> Result<impl Iterator<Item = RenewalStatus> + '_, AcmeError> {
        Ok(self.scan_at(now)?.filter(RenewalStatus::renewal_due))
    }

    /// Status row for one application, or why there is none
    pub fn status(&self, app: &AppName, now: DateTime<Utc>) -> Result<RenewalStatus, AcmeError> {
        let expiry = self.expiry.installed_expiry(app)?;
        let window = self.scheduler.window(app, expiry, now)?;
        Ok(RenewalStatus::new(app.clone(), window))
    }

    fn scan_app(&self, app: AppName, now: DateTime<Utc>) -> Option<RenewalStatus> {
        let reason = self.matcher.check(&app);
        if !reason.is_managed() {
            debug!(app = %app, reason = %reason, "Skipping unmanaged application");
            return None;
        }

        match self.status(&app, now) {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(app = %app, error = %e, "Excluding application from renewal report");
                None
            }
        }
    }
}

impl fmt::Debug for FleetScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FleetScanner").finish_non_exhaustive()
    }
}
