#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Message handling for the assistant bot.
//!
//! Quota accounting, per-user thread sessions and the run lifecycle that turns
//! one inbound message into at most one assistant answer.
//!
//! # Key Features
//! - Daily message quotas that reset lazily at the date boundary
//! - One remote thread per user, discarded on reset or failure
//! - Fixed-interval polling with a wall-clock timeout and shutdown cancellation
//! - Per-user mutual exclusion around the whole exchange

mod manager;
mod run;
mod session;
mod usage;

pub use manager::{
    ConversationOrchestrator, FEEDBACK_KEYBOARD, FEEDBACK_PROMPT, InboundMessage, LIMIT_REACHED,
};
pub use run::{Reply, RunError, RunLifecycleController, RunSettings, RunState};
pub use session::{Session, SessionRegistry};
pub use usage::{UsageReport, UsageTracker};
