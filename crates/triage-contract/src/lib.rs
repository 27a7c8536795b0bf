//! Shared payload types and service seams for the triagebot crates.
//!
//! Every adapter (chat transport, issue tracker, permission store) implements
//! the traits defined here; the command core depends only on this crate.

pub mod bot_contract;

pub use bot_contract::*;
