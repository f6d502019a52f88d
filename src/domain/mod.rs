//! Domain layer - Core business objects and the seams to infrastructure
//!
//! This layer contains:
//! - Entities: Message, User, Command
//! - Traits: Abstractions for infrastructure (Bot, DisabledListStore)

pub mod entities;
pub mod traits;
