use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;

use triage_contract::{IncomingMessage, IssueTracker, Messenger, PermissionAuthority};

use crate::command::{message_matches, Command, PERMISSION_DENIED_REPLY};
use crate::command_parsers::{capture_string, label_changes};

const SET_LABELS_PATTERN: &str = r"(?i)^!l(?:abel)?\s+#?(\d+)\s+(.+)";

const ISSUE_LABEL_PERMISSIONS: &[&str] = &["admin", "label", "issue", "issue:label"];
const PULL_REQUEST_LABEL_PERMISSIONS: &[&str] = &["admin", "label", "pr", "pr:label"];

/// Handles `!l #123 bug, -docs`: adds/removes repository labels on the
/// target issue or pull request.
///
/// Authorization is content-dependent: the target must be fetched first to
/// learn whether it is a pull request, because issues and pull requests are
/// gated by different token sets.
pub struct SetLabelsCommand {
    pattern: Regex,
    tracker: Arc<dyn IssueTracker>,
    authority: Arc<dyn PermissionAuthority>,
    messenger: Arc<dyn Messenger>,
}

impl SetLabelsCommand {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        authority: Arc<dyn PermissionAuthority>,
        messenger: Arc<dyn Messenger>,
    ) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(SET_LABELS_PATTERN)
                .context("failed to compile label pattern")?,
            tracker,
            authority,
            messenger,
        })
    }

    fn issue_number(&self, text: &str) -> Result<String> {
        capture_string(&self.pattern, text, 1)
            .ok_or_else(|| anyhow!("label command executed without an issue number"))
    }
}

#[async_trait]
impl Command for SetLabelsCommand {
    fn name(&self) -> &'static str {
        "set_labels"
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    async fn can_execute(&self, payload: &IncomingMessage) -> Result<bool> {
        if !message_matches(&self.pattern, payload) {
            return Ok(false);
        }

        let number = self.issue_number(&payload.text)?;
        let issue = self.tracker.fetch_issue(&number).await?;
        let required = if issue.is_pull_request() {
            PULL_REQUEST_LABEL_PERMISSIONS
        } else {
            ISSUE_LABEL_PERMISSIONS
        };

        let authorized = self
            .authority
            .has_any_permission(&payload.user_id, required)
            .await?;
        if !authorized {
            self.messenger
                .send_message(PERMISSION_DENIED_REPLY, payload)
                .await?;
        }
        Ok(authorized)
    }

    async fn execute(&self, payload: &IncomingMessage) -> Result<()> {
        let number = self.issue_number(&payload.text)?;
        let tail = capture_string(&self.pattern, &payload.text, 2)
            .ok_or_else(|| anyhow!("label command executed without a label list"))?;

        let repository_labels = self.tracker.repository_labels().await?;
        let changes = label_changes(&tail, &repository_labels);

        self.tracker.add_labels(&number, &changes.add).await?;
        self.tracker.remove_labels(&number, &changes.remove).await?;

        let current = self.tracker.issue_labels(&number).await?;
        let reply = if current.is_empty() {
            format!("Issue #{number} has been updated. It now has 0 labels.")
        } else {
            format!(
                "Issue #{number} has been updated. It now has the following label(s): `{}`.",
                current.join("`, `")
            )
        };
        self.messenger.send_message(&reply, payload).await
    }
}
