use std::path::PathBuf;

use clap::Parser;

/// Command-line and environment configuration for the triage bot.
#[derive(Debug, Parser)]
#[command(
    name = "triage-bot",
    about = "Chat-driven triage bot for GitHub issues and pull requests",
    version
)]
pub(crate) struct Cli {
    /// Slack app-level token used to open Socket Mode connections.
    #[arg(long, env = "TRIAGEBOT_SLACK_APP_TOKEN", hide_env_values = true)]
    pub(crate) slack_app_token: String,

    /// Slack bot token used for Web API calls such as chat.postMessage.
    #[arg(long, env = "TRIAGEBOT_SLACK_BOT_TOKEN", hide_env_values = true)]
    pub(crate) slack_bot_token: String,

    /// Slack Web API base URL.
    #[arg(
        long,
        env = "TRIAGEBOT_SLACK_API_BASE",
        default_value = "https://slack.com/api"
    )]
    pub(crate) slack_api_base: String,

    /// Bot user id to ignore in incoming events. Resolved via auth.test when unset.
    #[arg(long, env = "TRIAGEBOT_SLACK_BOT_USER_ID")]
    pub(crate) slack_bot_user_id: Option<String>,

    /// GitHub token used for issue and label operations.
    #[arg(long, env = "TRIAGEBOT_GITHUB_TOKEN", hide_env_values = true)]
    pub(crate) github_token: String,

    /// GitHub REST API base URL.
    #[arg(
        long,
        env = "TRIAGEBOT_GITHUB_API_BASE",
        default_value = "https://api.github.com"
    )]
    pub(crate) github_api_base: String,

    /// Owner of the repository the bot operates on.
    #[arg(long, env = "TRIAGEBOT_GITHUB_OWNER")]
    pub(crate) github_owner: String,

    /// Name of the repository the bot operates on.
    #[arg(long, env = "TRIAGEBOT_GITHUB_REPO")]
    pub(crate) github_repo: String,

    /// Directory holding the permission store and queued issue actions.
    #[arg(long, env = "TRIAGEBOT_STATE_DIR", default_value = ".triage-bot")]
    pub(crate) state_dir: PathBuf,

    /// Timeout for individual Slack and GitHub API requests in milliseconds.
    #[arg(long, env = "TRIAGEBOT_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub(crate) request_timeout_ms: u64,

    /// Maximum age of an incoming Slack event before it is dropped as stale.
    /// Zero disables the staleness check.
    #[arg(long, env = "TRIAGEBOT_MAX_EVENT_AGE_SECONDS", default_value_t = 300)]
    pub(crate) max_event_age_seconds: u64,

    /// Delay before reconnecting after a dropped socket connection.
    #[arg(long, env = "TRIAGEBOT_RECONNECT_DELAY_MS", default_value_t = 5_000)]
    pub(crate) reconnect_delay_ms: u64,
}
