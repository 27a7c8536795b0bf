use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use triage_contract::{EventKind, IncomingMessage};

/// Reply sent by gated commands when the invoker fails an authorization check.
pub const PERMISSION_DENIED_REPLY: &str = "You do not have permission to use this command.";

/// True when the payload is a genuine user message whose text satisfies
/// `pattern`.
///
/// Subtyped events (edits, joins, bot chatter) never match. `Regex` keeps no
/// match-position state, so repeated checks over the same payload always
/// agree.
pub fn message_matches(pattern: &Regex, payload: &IncomingMessage) -> bool {
    payload.subtype.is_none() && pattern.is_match(&payload.text)
}

/// A chat-triggered unit of work with a two-phase lifecycle.
///
/// `can_execute` decides eligibility; `execute` performs side effects and
/// replies. The registry only calls `execute` after `can_execute` returned
/// true for the same payload, and contains failures from both phases so one
/// command never disrupts another.
///
/// The provided `can_execute` covers ungated commands (subtype check plus
/// pattern match). Permission-gated commands override it, run the same base
/// check first, and only then consult the permission authority; a denied
/// invoker gets `PERMISSION_DENIED_REPLY` and the command stays ineligible.
#[async_trait]
pub trait Command: Send + Sync {
    /// Stable name used in dispatch logs.
    fn name(&self) -> &'static str;

    fn pattern(&self) -> &Regex;

    fn event_kind(&self) -> EventKind {
        EventKind::Message
    }

    async fn can_execute(&self, payload: &IncomingMessage) -> Result<bool> {
        Ok(message_matches(self.pattern(), payload))
    }

    /// Only invoked when `can_execute` returned true for the same payload.
    async fn execute(&self, payload: &IncomingMessage) -> Result<()>;
}
