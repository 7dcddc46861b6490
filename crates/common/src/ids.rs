//! Type-safe identifier newtypes for tlskeeper.
//!
//! Application names flow through config lookups, certificate stores and
//! partition paths. Wrapping them keeps a domain name or a digest from being
//! passed where an application is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Application identifier.
///
/// Names one hosted application. Applications own at most one installed
/// certificate and one app-scope settings layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(String);

impl AppName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AppName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AppName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for AppName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_name() {
        let name = AppName::new("shop");
        assert_eq!(name.as_str(), "shop");
        assert_eq!(name.to_string(), "shop");
        assert_eq!(AppName::from("shop"), name);
    }

    #[test]
    fn test_app_name_ordering() {
        let mut names = vec![AppName::new("shop"), AppName::new("api"), AppName::new("blog")];
        names.sort();
        assert_eq!(names[0].as_str(), "api");
        assert_eq!(names[2].as_str(), "shop");
    }
}
