//! Slack Socket Mode transport for the triage bot.
//!
//! Connects over Socket Mode, normalizes channel message events into command
//! payloads, and posts command replies back through the Web API.

pub mod slack_runtime;

pub use slack_runtime::{run_slack_socket, SlackMessenger, SlackSocketRuntimeConfig};
