use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;

use triage_contract::{IncomingMessage, Messenger, PermissionAuthority};

use crate::command::{message_matches, Command, PERMISSION_DENIED_REPLY};
use crate::command_parsers::{capture_string, ADMIN_PERMISSION};

// End-anchored so a trailing token list falls through to the grant command.
const LIST_PATTERN: &str = r"(?i)^!p(?:ermission(?:s)?)?\s+<@(U\w+)>\s*$";
const NO_PERMISSIONS_REPLY: &str = "User has no permissions.";

/// Handles `!p <@user>`: lists the mentioned user's permission tokens.
/// Admin-gated.
pub struct ListPermissionsCommand {
    pattern: Regex,
    authority: Arc<dyn PermissionAuthority>,
    messenger: Arc<dyn Messenger>,
}

impl ListPermissionsCommand {
    pub fn new(authority: Arc<dyn PermissionAuthority>, messenger: Arc<dyn Messenger>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(LIST_PATTERN).context("failed to compile list pattern")?,
            authority,
            messenger,
        })
    }
}

#[async_trait]
impl Command for ListPermissionsCommand {
    fn name(&self) -> &'static str {
        "list_permissions"
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    async fn can_execute(&self, payload: &IncomingMessage) -> Result<bool> {
        if !message_matches(&self.pattern, payload) {
            return Ok(false);
        }
        let authorized = self
            .authority
            .has_any_permission(&payload.user_id, &[ADMIN_PERMISSION])
            .await?;
        if !authorized {
            self.messenger
                .send_message(PERMISSION_DENIED_REPLY, payload)
                .await?;
        }
        Ok(authorized)
    }

    async fn execute(&self, payload: &IncomingMessage) -> Result<()> {
        let target_user = capture_string(&self.pattern, &payload.text, 1)
            .ok_or_else(|| anyhow!("list command executed without a user mention"))?;
        let permissions = self.authority.permissions_for(&target_user).await?;

        if permissions.is_empty() {
            return self.messenger.send_message(NO_PERMISSIONS_REPLY, payload).await;
        }

        let listing = permissions.join("`, `");
        let reply = format!("User has the following permissions: `{listing}`.");
        self.messenger.send_message(&reply, payload).await
    }
}
