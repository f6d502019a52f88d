//! Application services - the bot's own commands and the message loop

pub mod command_service;
pub mod message_service;

pub use command_service::CommandService;
pub use message_service::MessageService;
