use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;

use triage_contract::{
    FieldLayout, IncomingMessage, IssueAssignee, IssueLabel, IssueTracker, LinkableText,
    Messenger, RichField, RichMessage, TrackedIssue,
};

use crate::command::Command;
use crate::command_parsers::capture_string;

const INFO_PATTERN: &str = r"(?i)^!i(?:nfo)?\s+#?(\d+)";
const OPEN_STATE_COLOR: &str = "#2cbe4e";
const CLOSED_STATE_COLOR: &str = "#cb2431";
const EMPTY_FIELD_PLACEHOLDER: &str = "None";

/// Handles `!i #123` / `!info #123`: fetches the issue and replies with a
/// rich summary card.
pub struct GetIssueInfoCommand {
    pattern: Regex,
    tracker: Arc<dyn IssueTracker>,
    messenger: Arc<dyn Messenger>,
}

impl GetIssueInfoCommand {
    pub fn new(tracker: Arc<dyn IssueTracker>, messenger: Arc<dyn Messenger>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(INFO_PATTERN).context("failed to compile info pattern")?,
            tracker,
            messenger,
        })
    }

    fn issue_number(&self, text: &str) -> Result<String> {
        capture_string(&self.pattern, text, 1)
            .ok_or_else(|| anyhow!("info command executed without an issue number"))
    }
}

#[async_trait]
impl Command for GetIssueInfoCommand {
    fn name(&self) -> &'static str {
        "get_issue_info"
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    async fn execute(&self, payload: &IncomingMessage) -> Result<()> {
        let number = self.issue_number(&payload.text)?;
        let issue = self.tracker.fetch_issue(&number).await?;
        let summary = render_issue_summary(&issue);
        self.messenger.send_rich_message(&summary, payload).await
    }
}

/// Builds the rich summary card for one fetched issue.
///
/// Pull requests and issues share the wire shape; only the `pull_request`
/// marker distinguishes the title prefix. The card color tracks open/closed
/// state, and empty label/assignee lists render a literal "None" entry.
pub fn render_issue_summary(issue: &TrackedIssue) -> RichMessage {
    let kind = if issue.is_pull_request() {
        "Pull Request"
    } else {
        "Issue"
    };
    RichMessage {
        title: LinkableText::new(
            format!("{kind} #{}: {}", issue.number, issue.title),
            issue.html_url.clone(),
        ),
        color: state_color(&issue.state).to_string(),
        author: LinkableText::new(issue.user.login.clone(), issue.user.html_url.clone()),
        fields: vec![
            RichField {
                title: "Label(s)".to_string(),
                values: label_entries(&issue.labels),
                layout: FieldLayout::Short,
            },
            RichField {
                title: "Assignee(s)".to_string(),
                values: assignee_entries(&issue.assignees),
                layout: FieldLayout::Short,
            },
        ],
    }
}

fn state_color(state: &str) -> &'static str {
    if state == "open" {
        OPEN_STATE_COLOR
    } else {
        CLOSED_STATE_COLOR
    }
}

fn label_entries(labels: &[IssueLabel]) -> Vec<LinkableText> {
    if labels.is_empty() {
        return vec![LinkableText::plain(EMPTY_FIELD_PLACEHOLDER)];
    }
    labels
        .iter()
        .map(|label| LinkableText::plain(label.name.clone()))
        .collect()
}

fn assignee_entries(assignees: &[IssueAssignee]) -> Vec<LinkableText> {
    if assignees.is_empty() {
        return vec![LinkableText::plain(EMPTY_FIELD_PLACEHOLDER)];
    }
    assignees
        .iter()
        .map(|assignee| LinkableText::new(assignee.login.clone(), assignee.html_url.clone()))
        .collect()
}
