//! poke-back-core — reply to pokes aimed at the bot, and sometimes poke back.
//!
//! The host framework owns message delivery, LLM inference and platform I/O;
//! it reaches this crate through the traits in [`host`] and receives
//! [`events::PokeAction`]s in return.

pub mod config;
pub mod counter;
pub mod events;
pub mod handler;
pub mod host;
pub mod prompts;
pub mod types;
