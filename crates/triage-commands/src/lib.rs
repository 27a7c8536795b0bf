//! Command dispatch and authorization core for triagebot.
//!
//! A `Command` decides its own eligibility in two phases (pattern match, then
//! any authorization the command needs) and performs its side effects in
//! `execute`; the `CommandRegistry` offers every inbound event to every
//! registered command and contains per-command failures. Nothing here talks
//! to Slack or GitHub directly; adapters implement the `triage_contract`
//! seams and commands receive them at construction.

pub mod close_issue_command;
pub mod command;
pub mod command_parsers;
pub mod command_registry;
pub mod get_issue_info_command;
pub mod grant_permissions_command;
pub mod help_command;
pub mod list_permissions_command;
pub mod set_labels_command;

pub use close_issue_command::*;
pub use command::*;
pub use command_parsers::*;
pub use command_registry::*;
pub use get_issue_info_command::*;
pub use grant_permissions_command::*;
pub use help_command::*;
pub use list_permissions_command::*;
pub use set_labels_command::*;
