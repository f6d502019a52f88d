//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing, the command surface, dispatching
//! - Services: The bot's own commands and the message loop

pub mod errors;
pub mod services;
pub mod messaging;
