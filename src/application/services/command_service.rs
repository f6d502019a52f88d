use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

use crate::application::errors::{BotError, CommandError};
use crate::application::messaging::{CommandSurface, BOT_OWNER};
use crate::domain::entities::{Command, CommandContext, HandlerResult};
use crate::domain::traits::BotInfo;
use crate::infrastructure::config::Config;
use crate::plugins::{PluginRegistry, SharedPluginRegistry};

/// The bot's own commands, in help order
const BUILTIN_COMMANDS: [(&str, &str); 5] = [
    ("start", "Greeting and list of features provided."),
    ("help", "Help about my features."),
    ("settings", "View my settings."),
    ("enable_plugin", "plugin_name Enable plugin_name"),
    ("disable_plugin", "plugin_name Disable plugin_name"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    Enable,
    Disable,
}

impl Toggle {
    fn verb(self) -> &'static str {
        match self {
            Toggle::Enable => "enable",
            Toggle::Disable => "disable",
        }
    }
}

/// Fixed bot commands: greeting, help, settings and plugin toggling
///
/// Everything plugin-related is read from the registry on each call.
pub struct CommandService {
    registry: SharedPluginRegistry,
    config: Arc<Config>,
    info: BotInfo,
}

impl CommandService {
    pub fn new(registry: SharedPluginRegistry, config: Arc<Config>, info: BotInfo) -> Self {
        Self {
            registry,
            config,
            info,
        }
    }

    /// Bind the fixed commands on `surface`
    pub fn install(self: &Arc<Self>, surface: &CommandSurface) -> Result<(), BotError> {
        for (name, description) in BUILTIN_COMMANDS {
            let service = self.clone();
            let command = Command::new(name)
                .with_description(description)
                .with_handler(move |ctx| {
                    let service = service.clone();
                    async move { service.handle(name, ctx) }
                });
            surface.add(BOT_OWNER, command)?;
        }
        Ok(())
    }

    fn handle(&self, name: &str, ctx: CommandContext) -> HandlerResult {
        let reply = match name {
            "start" => self.start_message()?,
            "help" => self.help_message()?,
            "settings" => self.settings_message()?,
            "enable_plugin" => self.toggle(Toggle::Enable, &ctx)?,
            "disable_plugin" => self.toggle(Toggle::Disable, &ctx)?,
            other => return Err(CommandError::NotFound(other.to_string())),
        };
        Ok(Some(reply))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, PluginRegistry>, CommandError> {
        self.registry.read()
            .map_err(|_| CommandError::ExecutionFailed("Lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, PluginRegistry>, CommandError> {
        self.registry.write()
            .map_err(|_| CommandError::ExecutionFailed("Lock poisoned".to_string()))
    }

    pub fn start_message(&self) -> Result<String, CommandError> {
        let mut msg = format!("I am {} (@{})", self.info.name, self.info.username);
        for feature in self.read()?.feature_descriptions() {
            msg.push_str(&format!("\n- {}", feature));
        }
        Ok(msg)
    }

    pub fn help_message(&self) -> Result<String, CommandError> {
        let mut msg = "I am offering the following:".to_string();
        for (name, description) in BUILTIN_COMMANDS {
            msg.push_str(&format!("\n-/{}: {}", name, description));
        }
        for (name, description) in self.read()?.command_descriptions() {
            msg.push_str(&format!("\n-/{}: {}", name, description));
        }
        Ok(msg)
    }

    pub fn settings_message(&self) -> Result<String, CommandError> {
        let registry = self.read()?;
        Ok(format!(
            "Here is a list of my settings:\n- enabled_plugins: {}\n- disabled_plugins: {}",
            registry.enabled_names().join(", "),
            registry.disabled_names().join(", "),
        ))
    }

    fn toggle(&self, action: Toggle, ctx: &CommandContext) -> Result<String, CommandError> {
        let username = ctx.sender().and_then(|u| u.username.as_deref());
        if !self.config.is_bot_admin(username) {
            tracing::warn!("[{}] {:?} may not {} plugins", ctx.chat_id(), username, action.verb());
            return Ok(format!("You must be admin to {} plugins", action.verb()));
        }

        let [name] = ctx.args.as_slice() else {
            return Ok(format!("You must specify which plugin you want to {}", action.verb()));
        };

        let mut registry = self.write()?;
        let outcome = match action {
            Toggle::Enable => registry.enable(name),
            Toggle::Disable => registry.disable(name),
        };
        Ok(match outcome {
            Ok(()) => format!("Plugin {} {}d", name, action.verb()),
            Err(e) => e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::MessageDispatcher;
    use crate::domain::entities::User;
    use crate::domain::traits::Bot;
    use crate::infrastructure::storage::MemoryStore;
    use crate::plugins::PluginDiscovery;
    use crate::test_support::RecordingBot;

    fn config(disabled: Option<&str>, admins: &[&str]) -> Arc<Config> {
        let mut config = Config::default();
        config.plugins.disabled = disabled.map(str::to_string);
        config.plugins.trello.api_key = Some("key".into());
        config.plugins.trello.api_token = Some("token".into());
        config.bot.admins = admins.iter().map(|a| a.to_string()).collect();
        Arc::new(config)
    }

    fn setup(config: Arc<Config>) -> (CommandSurface, MessageDispatcher) {
        let surface = CommandSurface::new();
        let store = Arc::new(MemoryStore::new(config.plugins.disabled.clone()));
        let registry = PluginRegistry::construct(
            surface.clone(),
            &PluginDiscovery::builtin(),
            store,
            config.clone(),
        )
        .into_shared();
        let info = RecordingBot::shared().bot_info();
        let service = Arc::new(CommandService::new(registry, config, info));
        service.install(&surface).unwrap();
        (surface.clone(), MessageDispatcher::new("/", surface))
    }

    async fn say(dispatcher: &MessageDispatcher, user: &str, text: &str) -> String {
        let message = dispatcher
            .parser()
            .parse("1", text, Some(User::new("10").with_username(user)));
        dispatcher
            .dispatch(message, RecordingBot::shared())
            .await
            .unwrap()
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn start_lists_features_in_name_order() {
        let (_, dispatcher) = setup(config(None, &[]));
        assert_eq!(
            say(&dispatcher, "alice", "/start").await,
            "I am Reventlov (@reventlov_bot)\n\
             - I can manage pomodoro alarms for you\n\
             - I can manage Trello boards for you"
        );
    }

    #[tokio::test]
    async fn help_lists_fixed_then_plugin_commands() {
        let (_, dispatcher) = setup(config(None, &[]));
        let help = say(&dispatcher, "alice", "/help").await;
        let lines: Vec<&str> = help.lines().collect();
        assert_eq!(lines[0], "I am offering the following:");
        assert_eq!(lines[1], "-/start: Greeting and list of features provided.");
        assert_eq!(lines[5], "-/disable_plugin: plugin_name Disable plugin_name");
        assert_eq!(
            &lines[6..],
            &[
                "-/list: List objects visible to me.",
                "-/set: seconds [message...] Set alarm to fire in seconds.",
                "-/unset: Unset last alarm set.",
            ]
        );
    }

    #[tokio::test]
    async fn enable_plugin_round_trip() {
        let (surface, dispatcher) = setup(config(Some("trello"), &[]));
        assert_eq!(
            say(&dispatcher, "alice", "/settings").await,
            "Here is a list of my settings:\n- enabled_plugins: pomodoro\n- disabled_plugins: trello"
        );
        assert!(!surface.contains("list"));

        assert_eq!(say(&dispatcher, "alice", "/enable_plugin trello").await, "Plugin trello enabled");
        assert!(surface.contains("list"));
        assert_eq!(
            say(&dispatcher, "alice", "/settings").await,
            "Here is a list of my settings:\n- enabled_plugins: pomodoro, trello\n- disabled_plugins: "
        );

        assert_eq!(say(&dispatcher, "alice", "/disable_plugin trello").await, "Plugin trello disabled");
        assert!(!surface.contains("list"));
    }

    #[tokio::test]
    async fn user_errors_become_replies() {
        let (_, dispatcher) = setup(config(Some("trello"), &[]));
        assert_eq!(
            say(&dispatcher, "alice", "/enable_plugin").await,
            "You must specify which plugin you want to enable"
        );
        assert_eq!(
            say(&dispatcher, "alice", "/enable_plugin trello pomodoro").await,
            "You must specify which plugin you want to enable"
        );
        assert_eq!(say(&dispatcher, "alice", "/enable_plugin pomodoro").await, "Plugin pomodoro is not disabled");
        assert_eq!(say(&dispatcher, "alice", "/enable_plugin unknown_plugin").await, "Unknown plugin unknown_plugin");
        assert_eq!(say(&dispatcher, "alice", "/disable_plugin trello").await, "Plugin trello is not enabled");
    }

    #[tokio::test]
    async fn only_admins_toggle_plugins() {
        let (surface, dispatcher) = setup(config(Some("trello"), &["alice"]));
        assert_eq!(
            say(&dispatcher, "mallory", "/enable_plugin trello").await,
            "You must be admin to enable plugins"
        );
        assert!(!surface.contains("list"));
        assert_eq!(say(&dispatcher, "alice", "/enable_plugin trello").await, "Plugin trello enabled");
    }
}
