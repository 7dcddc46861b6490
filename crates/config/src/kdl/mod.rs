//! KDL settings parsing.
//!
//! A settings document is a flat list of nodes, one per key, each with a
//! single positional argument. The `domains` node is the exception: all of
//! its positional arguments are kept, in order.

use std::collections::BTreeMap;
use tracing::trace;

use crate::error::ConfigError;
use crate::keys;
use crate::layered::Settings;

/// Parse a settings document.
///
/// `origin` names the source (usually a file path) in error messages.
pub(crate) fn parse_settings(text: &str, origin: &str) -> Result<Settings, ConfigError> {
    trace!(origin = %origin, "Parsing settings document");

    let doc: ::kdl::KdlDocument = text.parse().map_err(|e: ::kdl::KdlError| ConfigError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;

    let mut values = BTreeMap::new();
    let mut domains = Vec::new();

    for node in doc.nodes() {
        let key = node.name().value();

        if key == keys::DOMAINS {
            for entry in node.entries().iter().filter(|e| e.name().is_none()) {
                let domain = value_to_string(entry.value()).ok_or_else(|| {
                    ConfigError::InvalidValue {
                        origin: origin.to_string(),
                        key: key.to_string(),
                    }
                })?;
                domains.push(domain);
            }
            continue;
        }

        let value = get_first_arg_string(node).ok_or_else(|| ConfigError::InvalidValue {
            origin: origin.to_string(),
            key: key.to_string(),
        })?;

        trace!(origin = %origin, key = %key, "Parsed setting");
        values.insert(key.to_string(), value);
    }

    trace!(
        origin = %origin,
        setting_count = values.len(),
        domain_count = domains.len(),
        "Finished parsing settings"
    );

    Ok(Settings::from_parts(values, domains))
}

/// First positional argument of a node, rendered as a string
fn get_first_arg_string(node: &::kdl::KdlNode) -> Option<String> {
    let mut args = node.entries().iter().filter(|e| e.name().is_none());
    let first = args.next()?;
    if args.next().is_some() {
        return None;
    }
    value_to_string(first.value())
}

fn value_to_string(value: &::kdl::KdlValue) -> Option<String> {
    if let Some(s) = value.as_string() {
        return Some(s.to_string());
    }
    if let Some(i) = value.as_integer() {
        return Some(i.to_string());
    }
    value.as_bool().map(|b| b.to_string())
}
