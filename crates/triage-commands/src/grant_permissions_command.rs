use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;

use triage_contract::{IncomingMessage, Messenger, PermissionAuthority};

use crate::command::{message_matches, Command, PERMISSION_DENIED_REPLY};
use crate::command_parsers::{capture_string, permission_changes, ADMIN_PERMISSION};

const GRANT_PATTERN: &str = r"(?i)^!p(?:ermission(?:s)?)?\s+<@(U\w+)>\s+(.*)";
const PERMISSIONS_UPDATED_REPLY: &str = "Successfully updated permissions.";
const PERMISSIONS_UNCHANGED_REPLY: &str = "No permissions were updated.";

/// Handles `!p <@user> token1 -token2 ...`: grants and revokes permission
/// tokens for the mentioned user. Admin-gated.
pub struct GrantPermissionsCommand {
    pattern: Regex,
    authority: Arc<dyn PermissionAuthority>,
    messenger: Arc<dyn Messenger>,
}

impl GrantPermissionsCommand {
    pub fn new(authority: Arc<dyn PermissionAuthority>, messenger: Arc<dyn Messenger>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(GRANT_PATTERN).context("failed to compile grant pattern")?,
            authority,
            messenger,
        })
    }
}

#[async_trait]
impl Command for GrantPermissionsCommand {
    fn name(&self) -> &'static str {
        "grant_permissions"
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
            .ok_or_else(|| anyhow!("grant command executed without a user mention"))?;
        let tail = capture_string(&self.pattern, &payload.text, 2).unwrap_or_default();
        let changes = permission_changes(&tail);

        // Both calls always happen; the store treats empty lists as no-ops.
        self.authority
            .add_permissions(&target_user, &changes.add)
            .await?;
        self.authority
            .remove_permissions(&target_user, &changes.remove)
            .await?;

        let reply = if changes.is_empty() {
            PERMISSIONS_UNCHANGED_REPLY
        } else {
            PERMISSIONS_UPDATED_REPLY
        };
        self.messenger.send_message(reply, payload).await
    }
}
