//! Plugin system for reventlov
//!
//! Plugins are compiled in and listed by `PluginDiscovery`. The registry
//! instantiates the ones not named in the disabled list; each plugin binds
//! its own commands on the shared `CommandSurface` and revokes them again
//! when disabled.

pub mod disabled;
pub mod discovery;
pub mod pomodoro;
pub mod registry;
pub mod trait_def;
pub mod trello;

pub use disabled::DisabledSetResolver;
pub use discovery::{PluginDescriptor, PluginDiscovery};
pub use registry::{PluginRegistry, SharedPluginRegistry};
pub use trait_def::{Plugin, PluginCommands, PluginConstructor, PluginResult};
