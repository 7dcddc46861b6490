//! Renewal timing
//!
//! Renewal becomes due a grace period before expiry. Windows are derived
//! fresh on every query and never stored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tlskeeper_common::{AppName, SignedDuration};
use tlskeeper_config::{keys, ConfigScope, ConfigStore, LayeredConfig};
use tracing::trace;

use super::error::AcmeError;

/// Grace period used when neither scope sets one (30 days)
pub const DEFAULT_GRACE_PERIOD: SignedDuration = SignedDuration::from_days(30);

/// Expiry and renewal offsets relative to a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenewalWindow {
    pub expiry: DateTime<Utc>,
    pub grace_period: SignedDuration,
    /// Negative once the certificate has expired
    pub time_to_expiry: SignedDuration,
    /// Negative once renewal is overdue
    pub time_to_renewal: SignedDuration,
}

impl RenewalWindow {
    /// Compute the window at `now`. Pure; negative offsets are not errors.
    pub fn compute(
        expiry: DateTime<Utc>,
        grace_period: SignedDuration,
        now: DateTime<Utc>,
    ) -> Self {
        let time_to_expiry =
            SignedDuration::from_secs(expiry.timestamp().saturating_sub(now.timestamp()));

        Self {
            expiry,
            grace_period,
            time_to_expiry,
            time_to_renewal: time_to_expiry - grace_period,
        }
    }

    pub fn renewal_due(&self) -> bool {
        self.time_to_renewal.is_overdue()
    }

    pub fn is_expired(&self) -> bool {
        self.time_to_expiry.is_overdue()
    }
}

/// Grace period for an application: app setting, then global, then 30 days.
///
/// Values must be a non-negative whole number of seconds.
pub fn resolve_grace_period(config: &LayeredConfig) -> Result<SignedDuration, AcmeError> {
    let Some(value) = config.get(keys::GRACE_PERIOD) else {
        return Ok(DEFAULT_GRACE_PERIOD);
    };

    match value.trim().parse::<i64>() {
        Ok(seconds) if seconds >= 0 => Ok(SignedDuration::from_secs(seconds)),
        _ => Err(AcmeError::InvalidSetting {
            key: keys::GRACE_PERIOD.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Computes renewal windows with per-application grace periods
#[derive(Clone)]
pub struct RenewalScheduler {
    config: Arc<dyn ConfigStore>,
}

impl RenewalScheduler {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self { config }
    }

    pub fn grace_period(&self, app: &AppName) -> Result<SignedDuration, AcmeError> {
        let layered = self.config.layered(app)?;
        let grace = resolve_grace_period(&layered)?;
        trace!(
            app = %app,
            grace_period_secs = grace.seconds(),
            app_override = layered
                .get_scoped(&ConfigScope::App(app.clone()), keys::GRACE_PERIOD)
                .is_some(),
            "Resolved grace period"
        );
        Ok(grace)
    }

    pub fn window(
        &self,
        app: &AppName,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<RenewalWindow, AcmeError> {
        Ok(RenewalWindow::compute(expiry, self.grace_period(app)?, now))
    }
}

impl std::fmt::Debug for RenewalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewalScheduler").finish_non_exhaustive()
    }
}
