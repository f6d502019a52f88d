//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Usage: {0}")]
    MissingArgument(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Permission denied")]
    PermissionDenied,
}

/// Plugin lifecycle errors
///
/// `Initialization` is contained by the registry during startup. The rest
/// are precondition failures of `enable`/`disable` and end up as chat
/// replies, never as a crash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("Plugin {name} failed to initialize: {reason}")]
    Initialization { name: String, reason: String },

    #[error("Unknown plugin {0}")]
    Unknown(String),

    #[error("Plugin {0} is not disabled")]
    NotDisabled(String),

    #[error("Plugin {0} is not enabled")]
    NotEnabled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PluginError {
    pub fn initialization(name: impl Into<String>, reason: impl Into<String>) -> Self {
        PluginError::Initialization {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
