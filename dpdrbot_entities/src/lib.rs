//! Database entities for the bot's durable records.

pub mod conversations;
pub mod usage_stats;
pub mod users;
