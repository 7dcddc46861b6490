//! Common types shared across the tlskeeper crates.
//!
//! - [`AppName`] identifies a hosted application
//! - [`SignedDuration`] carries expiry and renewal offsets, which may be negative
//! - [`format_duration`] renders a signed second count for humans

pub mod duration;
pub mod ids;

pub use duration::{format_duration, SignedDuration};
pub use ids::AppName;
