//! Plugin trait definitions

use std::collections::BTreeMap;

use crate::application::errors::PluginError;
use crate::application::messaging::CommandSurface;
use crate::domain::entities::Command;
use crate::infrastructure::config::Config;

/// Shown for a registered command that carries no description
pub const UNDEFINED_COMMAND: &str = "Undefined command";

/// Result type for plugin lifecycle operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Builds a plugin. It must bind every command it offers on the surface
/// before returning.
pub type PluginConstructor = fn(&CommandSurface, &Config) -> PluginResult<Box<dyn Plugin>>;

/// Core plugin trait that all plugins must implement
pub trait Plugin: Send + Sync {
    /// Unique identifier for the plugin
    fn name(&self) -> &str;

    /// Plugin version
    fn version(&self) -> &str;

    /// One line on what the plugin offers, for the greeting
    fn feature_description(&self) -> Option<&str> {
        None
    }

    /// Commands this plugin bound during construction
    fn commands(&self) -> &PluginCommands;

    /// One line of help per registered command
    fn command_descriptions(&self) -> BTreeMap<String, String> {
        self.commands().descriptions()
    }

    /// Optional: release resources that outlive a single command
    fn cleanup(&self) {}

    /// Revoke every binding made during construction
    fn teardown(&self, surface: &CommandSurface) -> PluginResult<()> {
        self.cleanup();
        self.commands().revoke(surface)
    }
}

/// Bookkeeping for the commands a plugin binds
///
/// Everything registered through here is what `teardown` revokes, so a
/// plugin that only binds through `register` never leaks a handler.
#[derive(Debug, Clone)]
pub struct PluginCommands {
    owner: String,
    names: Vec<String>,
    descriptions: BTreeMap<String, String>,
}

impl PluginCommands {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            names: Vec::new(),
            descriptions: BTreeMap::new(),
        }
    }

    /// Bind `command` on the surface under this plugin's name
    pub fn register(&mut self, surface: &CommandSurface, command: Command) -> PluginResult<()> {
        let name = command.name.clone();
        if let Some(desc) = &command.description {
            self.descriptions.insert(name.clone(), desc.clone());
        }
        surface.add(&self.owner, command)
            .map_err(|e| PluginError::initialization(&self.owner, e.to_string()))?;
        self.names.push(name);
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Description per registered command, `Undefined command` where missing
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.names
            .iter()
            .map(|name| {
                let desc = self.descriptions.get(name)
                    .cloned()
                    .unwrap_or_else(|| UNDEFINED_COMMAND.to_string());
                (name.clone(), desc)
            })
            .collect()
    }

    pub fn revoke(&self, surface: &CommandSurface) -> PluginResult<()> {
        for name in &self.names {
            let removed = surface.remove(&self.owner, name)
                .map_err(|e| PluginError::Internal(e.to_string()))?;
            if !removed {
                tracing::warn!("Plugin {} had no binding left for /{}", self.owner, name);
            }
        }
        Ok(())
    }
}
