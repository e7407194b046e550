//! Kaiwa: conversational AI companion bot.
//!
//! Core engine: bounded per-user conversation memory, a multi-backend
//! text-generation failover client, a command registry, a timed quiz
//! state machine and an idempotent broadcast coordinator, all wired
//! behind a Messenger-style webhook.

pub mod broadcast;
pub mod cli;
pub mod commands;
pub mod core;
pub mod genai;
pub mod memory;
pub mod messenger;
pub mod persist;
pub mod quiz;
pub mod roster;
pub mod state;

pub use core::{AppError, AppResult};
pub use state::AppState;
