//! Message dispatcher - Routes commands to the handlers bound on the surface

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::application::errors::BotError;
use crate::domain::entities::{Command, CommandContext, Content, HandlerResult, Message};
use crate::domain::traits::Bot;
use super::parser::MessageParser;

/// Owner tag used by the bot's own fixed commands
pub const BOT_OWNER: &str = "bot";

#[derive(Clone)]
struct Binding {
    owner: String,
    command: Arc<Command>,
}

/// Handler registration surface
///
/// Cloning gives another handle onto the same bindings. Bindings for a name
/// stack up: the most recent one is live, and removing it brings back
/// whatever was bound before, so a register/remove pair leaves the surface
/// as it found it.
#[derive(Clone, Default)]
pub struct CommandSurface {
    bindings: Arc<RwLock<HashMap<String, Vec<Binding>>>>,
}

impl CommandSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `command` on behalf of `owner`
    pub fn add(&self, owner: &str, command: Command) -> Result<(), BotError> {
        let mut bindings = self.bindings.write()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;

        let stack = bindings.entry(command.name.clone()).or_default();
        if let Some(previous) = stack.last() {
            tracing::warn!(
                "Command /{} from {} shadows the one from {}",
                command.name, owner, previous.owner
            );
        }
        tracing::debug!("Bound /{} for {}", command.name, owner);
        stack.push(Binding {
            owner: owner.to_string(),
            command: Arc::new(command),
        });
        Ok(())
    }

    /// Revoke `owner`'s binding of `name`. Returns whether one was found.
    pub fn remove(&self, owner: &str, name: &str) -> Result<bool, BotError> {
        let mut bindings = self.bindings.write()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;

        let Some(stack) = bindings.get_mut(name) else {
            return Ok(false);
        };
        let Some(pos) = stack.iter().rposition(|b| b.owner == owner) else {
            return Ok(false);
        };
        stack.remove(pos);
        if stack.is_empty() {
            bindings.remove(name);
        }
        tracing::debug!("Unbound /{} for {}", name, owner);
        Ok(true)
    }

    /// The live command for `name`
    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.bindings.read()
            .ok()?
            .get(name)
            .and_then(|stack| stack.last())
            .map(|b| b.command.clone())
    }

    /// Who owns the live binding for `name`
    pub fn owner_of(&self, name: &str) -> Option<String> {
        self.bindings.read()
            .ok()?
            .get(name)
            .and_then(|stack| stack.last())
            .map(|b| b.owner.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names with a live binding, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Every binding, live or shadowed, as `(name, owner)` pairs, sorted
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut all: Vec<(String, String)> = self.bindings.read()
            .map(|b| {
                b.iter()
                    .flat_map(|(name, stack)| stack.iter().map(move |bd| (name.clone(), bd.owner.clone())))
                    .collect()
            })
            .unwrap_or_default();
        all.sort();
        all
    }

    pub fn len(&self) -> usize {
        self.bindings.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Message dispatcher - parses raw text and runs the bound handler
pub struct MessageDispatcher {
    parser: MessageParser,
    surface: CommandSurface,
}

impl MessageDispatcher {
    pub fn new(prefix: impl Into<String>, surface: CommandSurface) -> Self {
        Self {
            parser: MessageParser::new(prefix),
            surface,
        }
    }

    pub fn parser(&self) -> &MessageParser {
        &self.parser
    }

    pub fn surface(&self) -> &CommandSurface {
        &self.surface
    }

    /// Process a raw text message
    pub async fn process_text(
        &self,
        chat_id: impl Into<String>,
        text: impl Into<String>,
        bot: Arc<dyn Bot>,
    ) -> HandlerResult {
        let message = self.parser.parse(chat_id, text, None);
        self.dispatch(message, bot).await
    }

    /// Run the handler bound to the message's command, if any
    pub async fn dispatch(&self, message: Message, bot: Arc<dyn Bot>) -> HandlerResult {
        let Content::Command { name, .. } = &message.content else {
            return Ok(None);
        };

        // Clone out of the lock: handlers may rebind commands
        let Some(command) = self.surface.get(name) else {
            tracing::debug!("[{}] No handler for /{}", message.chat_id, name);
            return Ok(None);
        };

        tracing::debug!("[{}] Dispatching /{}", message.chat_id, name);
        command.invoke(CommandContext::new(message, bot)).await
    }
}
