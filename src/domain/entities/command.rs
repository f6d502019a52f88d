use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::domain::entities::{Message, User};
use crate::domain::traits::Bot;

/// What a handler produces: an optional reply for the originating chat
pub type HandlerResult = Result<Option<String>, CommandError>;

/// Boxed future returned by a command handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Command handler function type
pub type CommandHandler = Arc<dyn Fn(CommandContext) -> HandlerFuture + Send + Sync>;

/// Everything a handler gets to see about one invocation
#[derive(Clone)]
pub struct CommandContext {
    pub message: Message,
    pub args: Vec<String>,
    /// Outbound channel, for replies that happen after the handler returns
    pub bot: Arc<dyn Bot>,
}

impl CommandContext {
    pub fn new(message: Message, bot: Arc<dyn Bot>) -> Self {
        let args = message.args().to_vec();
        Self { message, args, bot }
    }

    pub fn chat_id(&self) -> &str {
        &self.message.chat_id
    }

    pub fn sender(&self) -> Option<&User> {
        self.message.sender.as_ref()
    }
}

/// Represents a bot command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub usage: Option<String>,
    pub handler: Option<CommandHandler>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            usage: None,
            handler: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx| Box::pin(handler(ctx))));
        self
    }

    /// Run the handler. A rejected argument list is answered with the
    /// command's usage line when it has one.
    pub async fn invoke(&self, ctx: CommandContext) -> HandlerResult {
        let Some(handler) = &self.handler else {
            return Ok(Some(format!("Command /{} not implemented", self.name)));
        };
        match (handler(ctx).await, &self.usage) {
            (Err(CommandError::InvalidArgs(reason)), Some(usage)) => {
                tracing::debug!("/{} rejected its arguments: {}", self.name, reason);
                Err(CommandError::MissingArgument(usage.clone()))
            }
            (result, _) => result,
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("usage", &self.usage)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Content;
    use crate::test_support::RecordingBot;

    fn context(args: &[&str]) -> CommandContext {
        let content = Content::Command {
            name: "roll".to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        };
        CommandContext::new(Message::new("1", content), RecordingBot::shared())
    }

    fn roll() -> Command {
        Command::new("roll").with_handler(|ctx| async move {
            match ctx.args.first().map(|a| a.parse::<u8>()) {
                Some(Ok(sides)) => Ok(Some(format!("d{}", sides))),
                _ => Err(CommandError::InvalidArgs("sides must be a small number".to_string())),
            }
        })
    }

    #[tokio::test]
    async fn argument_errors_render_usage() {
        let command = roll().with_usage("/roll sides");
        let err = command.invoke(context(&["many"])).await.unwrap_err();
        assert_eq!(err.to_string(), "Usage: /roll sides");

        let reply = command.invoke(context(&["6"])).await.unwrap();
        assert_eq!(reply.as_deref(), Some("d6"));
    }

    #[tokio::test]
    async fn without_usage_the_error_passes_through() {
        let err = roll().invoke(context(&[])).await.unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn missing_handler_says_so() {
        let reply = Command::new("roll").invoke(context(&[])).await.unwrap();
        assert_eq!(reply.as_deref(), Some("Command /roll not implemented"));
    }
}
