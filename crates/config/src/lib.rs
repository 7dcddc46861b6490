//! Settings for tlskeeper.
//!
//! Settings come in two scopes: a global layer shared by every application
//! and an app layer that overrides it key by key. Lookups go through an
//! explicit [`LayeredConfig`] built from both layers, so nothing depends on
//! process environment.
//!
//! # Example
//!
//! ```kdl
//! // <root>/settings.kdl
//! email "ops@example.com"
//! grace-period 2592000
//!
//! // <root>/apps/shop/settings.kdl
//! server "staging"
//! domains "shop.example.com" "www.shop.example.com"
//! ```

mod error;
mod kdl;
mod layered;
mod store;

pub use error::ConfigError;
pub use layered::{resolve, ConfigScope, LayeredConfig, Settings};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore, APPS_DIR, SETTINGS_FILE};

/// Well-known setting keys
pub mod keys {
    /// Contact email registered with the ACME account
    pub const EMAIL: &str = "email";
    /// ACME server alias (`default`, `staging`) or directory URL
    pub const SERVER: &str = "server";
    /// Terms-of-service digest override
    pub const TOS_HASH: &str = "tos-hash";
    /// Seconds before expiry at which renewal becomes due
    pub const GRACE_PERIOD: &str = "grace-period";
    /// App-scope node listing the application's domains
    pub const DOMAINS: &str = "domains";
}
