use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;

use triage_contract::{IncomingMessage, Messenger};

use crate::command::Command;

const HELP_PATTERN: &str = r"(?i)^!h(?:elp)?\s+#?(\d+)";

/// Handles `!h 1` / `!help 1`: replies with the command usage listing.
pub struct HelpCommand {
    pattern: Regex,
    messenger: Arc<dyn Messenger>,
}

impl HelpCommand {
    pub fn new(messenger: Arc<dyn Messenger>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(HELP_PATTERN).context("failed to compile help pattern")?,
            messenger,
        })
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    async fn execute(&self, payload: &IncomingMessage) -> Result<()> {
        self.messenger.send_message(&help_text(), payload).await
    }
}

/// Usage text listing every chat command the bot accepts.
pub fn help_text() -> String {
    [
        "Available commands:",
        "`!close #123` - queue issue 123 to be closed and label it `close`.",
        "`!info #123` (or `!i`) - show a summary card for issue or pull request 123.",
        "`!label #123 bug, -docs` (or `!l`) - add/remove repository labels on issue 123.",
        "`!permissions <@user> issue -pr` (or `!p`) - grant/revoke permission tokens (admin only).",
        "`!permissions <@user>` (or `!p`) - list a user's permission tokens (admin only).",
        "`!help 1` (or `!h`) - show this message.",
    ]
    .join("\n")
}
