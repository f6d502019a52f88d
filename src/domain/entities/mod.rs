//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;

pub use user::User;
pub use message::{Message, MessageType, Content};
pub use command::{Command, CommandContext, CommandHandler, HandlerFuture, HandlerResult};
