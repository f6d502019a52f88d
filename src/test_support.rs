//! Test doubles shared by unit tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::traits::{Bot, BotInfo};

/// Bot that records outbound messages instead of sending them
pub struct RecordingBot {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingBot {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    /// `(chat_id, text)` pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat_id.to_string(), text.to_string()));
        Ok(sent.len().to_string())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "1".to_string(),
            name: "Reventlov".to_string(),
            username: "reventlov_bot".to_string(),
        }
    }
}
