//! reventlov - a chat bot whose commands come from pluggable features
//!
//! Plugins bind commands on a shared `CommandSurface`; the plugin registry
//! decides which of them are live and can switch them on and off at runtime.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

#[cfg(test)]
pub(crate) mod test_support;
