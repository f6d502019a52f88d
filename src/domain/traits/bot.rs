use async_trait::async_trait;
use crate::application::errors::BotError;

/// Bot trait - outbound side of a messaging platform adapter
///
/// Plugins reach this through `CommandContext::bot` when they need to talk
/// to a chat outside of a direct reply, e.g. a timer firing later.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Send a message to a chat
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
