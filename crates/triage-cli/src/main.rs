mod bootstrap_helpers;
mod cli_args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use triage_access::JsonPermissionStore;
use triage_commands::{
    CloseIssueCommand, CommandRegistry, GetIssueInfoCommand, GrantPermissionsCommand, HelpCommand,
    ListPermissionsCommand, SetLabelsCommand,
};
use triage_contract::{IssueActionQueue, IssueTracker, Messenger, PermissionAuthority};
use triage_github::GithubIssueClient;
use triage_slack_runtime::{run_slack_socket, SlackMessenger, SlackSocketRuntimeConfig};

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = Arc::new(
        JsonPermissionStore::load_from_dir(&cli.state_dir)
            .context("failed to load permission store")?,
    );
    let authority: Arc<dyn PermissionAuthority> = store.clone();
    let action_queue: Arc<dyn IssueActionQueue> = store;

    let tracker: Arc<dyn IssueTracker> = Arc::new(GithubIssueClient::new(
        cli.github_api_base.clone(),
        &cli.github_token,
        cli.github_owner.clone(),
        cli.github_repo.clone(),
        cli.request_timeout_ms,
    )?);

    let slack_config = SlackSocketRuntimeConfig {
        api_base: cli.slack_api_base.clone(),
        app_token: cli.slack_app_token.clone(),
        bot_token: cli.slack_bot_token.clone(),
        bot_user_id: cli.slack_bot_user_id.clone(),
        request_timeout_ms: cli.request_timeout_ms,
        max_event_age_seconds: cli.max_event_age_seconds,
        reconnect_delay: Duration::from_millis(cli.reconnect_delay_ms),
    };
    let messenger: Arc<dyn Messenger> = Arc::new(SlackMessenger::new(&slack_config)?);

    let repository_url = format!(
        "https://github.com/{}/{}",
        cli.github_owner, cli.github_repo
    );

    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(CloseIssueCommand::new(
        tracker.clone(),
        action_queue,
        messenger.clone(),
        repository_url,
    )?));
    registry.register(Arc::new(GetIssueInfoCommand::new(
        tracker.clone(),
        messenger.clone(),
    )?));
    registry.register(Arc::new(GrantPermissionsCommand::new(
        authority.clone(),
        messenger.clone(),
    )?));
    registry.register(Arc::new(ListPermissionsCommand::new(
        authority.clone(),
        messenger.clone(),
    )?));
    registry.register(Arc::new(SetLabelsCommand::new(
        tracker,
        authority,
        messenger.clone(),
    )?));
    registry.register(Arc::new(HelpCommand::new(messenger)?));

    tracing::info!(
        commands = registry.command_count(),
        repository = %format!("{}/{}", cli.github_owner, cli.github_repo),
        "starting triage bot"
    );

    run_slack_socket(slack_config, registry).await
}
