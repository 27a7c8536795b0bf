use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;

use triage_contract::{
    IncomingMessage, IssueAction, IssueActionQueue, IssueActionRequest, IssueTracker, Messenger,
};

use crate::command::Command;
use crate::command_parsers::capture_string;

const CLOSE_PATTERN: &str = r"(?i)^!close\s+#?(\d+)";
const CLOSE_LABEL: &str = "close";

/// Handles `!close #123`: queues a close action for out-of-band processing
/// and labels the issue `close` so the tracker-side automation picks it up.
pub struct CloseIssueCommand {
    pattern: Regex,
    tracker: Arc<dyn IssueTracker>,
    action_queue: Arc<dyn IssueActionQueue>,
    messenger: Arc<dyn Messenger>,
    repository_url: String,
}

impl CloseIssueCommand {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        action_queue: Arc<dyn IssueActionQueue>,
        messenger: Arc<dyn Messenger>,
        repository_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(CLOSE_PATTERN).context("failed to compile close pattern")?,
            tracker,
            action_queue,
            messenger,
            repository_url: repository_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn issue_number(&self, text: &str) -> Result<String> {
        capture_string(&self.pattern, text, 1)
            .ok_or_else(|| anyhow!("close command executed without an issue number"))
    }
}

#[async_trait]
impl Command for CloseIssueCommand {
    fn name(&self) -> &'static str {
        "close_issue"
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    async fn execute(&self, payload: &IncomingMessage) -> Result<()> {
        let number = self.issue_number(&payload.text)?;
        self.action_queue
            .enqueue_issue_action(IssueActionRequest {
                issue_number: number.clone(),
                action: IssueAction::Close,
            })
            .await?;
        self.tracker
            .add_labels(&number, &[CLOSE_LABEL.to_string()])
            .await?;

        let reply = format!(
            "Issue <{}/issues/{}|#{}> has been labeled `{}` and added to the list to be closed.",
            self.repository_url, number, number, CLOSE_LABEL
        );
        self.messenger.send_message(&reply, payload).await
    }
}
