use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::messaging::MessageDispatcher;
use crate::domain::entities::Message;
use crate::domain::traits::Bot;

/// Service for processing messages: dispatch, then reply to the same chat
pub struct MessageService {
    dispatcher: MessageDispatcher,
    bot: Arc<dyn Bot>,
}

impl MessageService {
    pub fn new(dispatcher: MessageDispatcher, bot: Arc<dyn Bot>) -> Self {
        Self { dispatcher, bot }
    }

    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    pub fn bot(&self) -> &Arc<dyn Bot> {
        &self.bot
    }

    /// Handle one message to completion. Command failures are turned into a
    /// reply; only a failure to send that reply is returned as an error.
    pub async fn process(&self, message: Message) -> Result<Option<String>, BotError> {
        let chat_id = message.chat_id.clone();
        tracing::info!("[{}] Processing message: {:?}", chat_id, message.content);

        let reply = match self.dispatcher.dispatch(message, self.bot.clone()).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("[{}] Command failed: {}", chat_id, e);
                Some(e.to_string())
            }
        };

        if let Some(text) = &reply {
            self.respond(&chat_id, text).await?;
        }
        Ok(reply)
    }

    /// Parse raw text from `chat_id` and process it
    pub async fn process_text(&self, chat_id: &str, text: &str) -> Result<Option<String>, BotError> {
        let message = self.dispatcher.parser().parse(chat_id, text, None);
        self.process(message).await
    }

    /// Send a response message
    pub async fn respond(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        self.bot.send_message(chat_id, text).await
    }
}
