//! Message handling - parsing and routing commands to their handlers

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{CommandSurface, MessageDispatcher, BOT_OWNER};
pub use parser::MessageParser;
