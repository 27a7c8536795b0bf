use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;
use triage_access::JsonPermissionStore;
use triage_commands::{
    CloseIssueCommand, CommandRegistry, GetIssueInfoCommand, GrantPermissionsCommand, HelpCommand,
    ListPermissionsCommand, SetLabelsCommand, PERMISSION_DENIED_REPLY,
};
use triage_contract::{
    EventKind, IncomingMessage, IssueActionQueue, IssueAuthor, IssueLabel, IssueTracker, Messenger,
    PermissionAuthority, RichMessage, TrackedIssue,
};

const REPOSITORY_URL: &str = "https://github.com/octo/widgets";

struct RecordingMessenger {
    messages: Mutex<Vec<String>>,
    rich_messages: Mutex<Vec<RichMessage>>,
}

impl RecordingMessenger {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            rich_messages: Mutex::new(Vec::new()),
        })
    }

    fn plain_messages(&self) -> Vec<String> {
        self.messages.lock().expect("messenger lock").clone()
    }

    fn rich_messages(&self) -> Vec<RichMessage> {
        self.rich_messages.lock().expect("messenger lock").clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, text: &str, _payload: &IncomingMessage) -> Result<()> {
        self.messages
            .lock()
            .expect("messenger lock")
            .push(text.to_string());
        Ok(())
    }

    async fn send_rich_message(
        &self,
        message: &RichMessage,
        _payload: &IncomingMessage,
    ) -> Result<()> {
        self.rich_messages
            .lock()
            .expect("messenger lock")
            .push(message.clone());
        Ok(())
    }
}

struct ScriptedTracker {
    issue: Option<TrackedIssue>,
    repository_labels: Vec<String>,
    issue_labels_after: Vec<String>,
    added: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedTracker {
    fn new(issue: Option<TrackedIssue>) -> Arc<Self> {
        Arc::new(Self {
            issue,
            repository_labels: vec!["bug".to_string(), "docs".to_string()],
            issue_labels_after: vec!["bug".to_string()],
            added: Mutex::new(Vec::new()),
        })
    }

    fn added(&self) -> Vec<(String, Vec<String>)> {
        self.added.lock().expect("tracker lock").clone()
    }
}

#[async_trait]
impl IssueTracker for ScriptedTracker {
    async fn fetch_issue(&self, _number: &str) -> Result<TrackedIssue> {
        match &self.issue {
            Some(issue) => Ok(issue.clone()),
            None => bail!("no scripted issue configured"),
        }
    }

    async fn repository_labels(&self) -> Result<Vec<String>> {
        Ok(self.repository_labels.clone())
    }

    async fn issue_labels(&self, _number: &str) -> Result<Vec<String>> {
        Ok(self.issue_labels_after.clone())
    }

    async fn add_labels(&self, number: &str, labels: &[String]) -> Result<()> {
        if !labels.is_empty() {
            self.added
                .lock()
                .expect("tracker lock")
                .push((number.to_string(), labels.to_vec()));
        }
        Ok(())
    }

    async fn remove_labels(&self, _number: &str, _labels: &[String]) -> Result<()> {
        Ok(())
    }
}

fn sample_issue(number: u64) -> TrackedIssue {
    TrackedIssue {
        number,
        title: "Fix the build matrix".to_string(),
        html_url: format!("{REPOSITORY_URL}/issues/{number}"),
        state: "open".to_string(),
        user: IssueAuthor {
            login: "alice".to_string(),
            html_url: "https://github.com/alice".to_string(),
        },
        labels: vec![IssueLabel {
            name: "bug".to_string(),
        }],
        assignees: Vec::new(),
        pull_request: None,
    }
}

fn message_from(user_id: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        text: text.to_string(),
        user_id: user_id.to_string(),
        channel_id: "C100".to_string(),
        thread_id: Some("42.1".to_string()),
        subtype: None,
    }
}

/// Wires every command against a shared store the way the binary does.
fn build_registry(
    store: &Arc<JsonPermissionStore>,
    tracker: &Arc<ScriptedTracker>,
    messenger: &Arc<RecordingMessenger>,
) -> Result<CommandRegistry> {
    let tracker: Arc<dyn IssueTracker> = tracker.clone();
    let messenger: Arc<dyn Messenger> = messenger.clone();
    let authority: Arc<dyn PermissionAuthority> = store.clone();
    let action_queue: Arc<dyn IssueActionQueue> = store.clone();

    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(CloseIssueCommand::new(
        tracker.clone(),
        action_queue,
        messenger.clone(),
        REPOSITORY_URL,
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
    Ok(registry)
}

#[tokio::test]
async fn integration_close_command_round_trips_registry_tracker_and_store() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store =
        Arc::new(JsonPermissionStore::load_from_dir(tempdir.path()).expect("load store"));
    let tracker = ScriptedTracker::new(Some(sample_issue(1234)));
    let messenger = RecordingMessenger::new();
    let registry = build_registry(&store, &tracker, &messenger).expect("build registry");

    registry
        .dispatch(EventKind::Message, &message_from("U100", "!close #1234"))
        .await;

    assert_eq!(
        tracker.added(),
        vec![("1234".to_string(), vec!["close".to_string()])]
    );

    let actions = store.issue_actions().await;
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].issue_number, "1234");
    assert_eq!(actions[0].action, "close");

    let replies = messenger.plain_messages();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("<https://github.com/octo/widgets/issues/1234|#1234>"));
    assert!(replies[0].contains("labeled `close`"));
}

#[tokio::test]
async fn integration_granted_permission_unlocks_label_command() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store =
        Arc::new(JsonPermissionStore::load_from_dir(tempdir.path()).expect("load store"));
    store
        .add_permissions("UADMIN", &["admin".to_string()])
        .await
        .expect("seed admin");
    let tracker = ScriptedTracker::new(Some(sample_issue(5)));
    let messenger = RecordingMessenger::new();
    let registry = build_registry(&store, &tracker, &messenger).expect("build registry");

    registry
        .dispatch(
            EventKind::Message,
            &message_from("UADMIN", "!p <@U100> label"),
        )
        .await;
    registry
        .dispatch(EventKind::Message, &message_from("U100", "!l #5 bug"))
        .await;
    registry
        .dispatch(EventKind::Message, &message_from("UADMIN", "!p <@U100>"))
        .await;

    assert_eq!(
        messenger.plain_messages(),
        vec![
            "Successfully updated permissions.".to_string(),
            "Issue #5 has been updated. It now has the following label(s): `bug`.".to_string(),
            "User has the following permissions: `label`.".to_string(),
        ]
    );
    assert_eq!(
        tracker.added(),
        vec![("5".to_string(), vec!["bug".to_string()])]
    );
}

#[tokio::test]
async fn functional_queued_actions_survive_store_reload() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    {
        let store =
            Arc::new(JsonPermissionStore::load_from_dir(tempdir.path()).expect("first load"));
        let tracker = ScriptedTracker::new(Some(sample_issue(77)));
        let messenger = RecordingMessenger::new();
        let registry = build_registry(&store, &tracker, &messenger).expect("build registry");
        registry
            .dispatch(EventKind::Message, &message_from("U100", "!close 77"))
            .await;
    }

    let reopened = JsonPermissionStore::load_from_dir(tempdir.path()).expect("second load");
    let actions = reopened.issue_actions().await;
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].issue_number, "77");
    assert_eq!(actions[0].action, "close");
    assert!(actions[0].requested_unix_ms > 0);
}

#[tokio::test]
async fn regression_unauthorized_user_cannot_mutate_labels() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store =
        Arc::new(JsonPermissionStore::load_from_dir(tempdir.path()).expect("load store"));
    let tracker = ScriptedTracker::new(Some(sample_issue(5)));
    let messenger = RecordingMessenger::new();
    let registry = build_registry(&store, &tracker, &messenger).expect("build registry");

    registry
        .dispatch(EventKind::Message, &message_from("U100", "!l #5 bug"))
        .await;

    assert_eq!(
        messenger.plain_messages(),
        vec![PERMISSION_DENIED_REPLY.to_string()]
    );
    assert!(tracker.added().is_empty());
}

#[tokio::test]
async fn regression_pull_request_labeling_requires_pr_scoped_tokens() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store =
        Arc::new(JsonPermissionStore::load_from_dir(tempdir.path()).expect("load store"));
    store
        .add_permissions("U100", &["issue".to_string()])
        .await
        .expect("seed issue token");
    let mut pull = sample_issue(6);
    pull.pull_request = Some(json!({
        "url": "https://api.github.com/repos/octo/widgets/pulls/6"
    }));
    let tracker = ScriptedTracker::new(Some(pull));
    let messenger = RecordingMessenger::new();
    let registry = build_registry(&store, &tracker, &messenger).expect("build registry");

    registry
        .dispatch(EventKind::Message, &message_from("U100", "!l #6 bug"))
        .await;

    assert_eq!(
        messenger.plain_messages(),
        vec![PERMISSION_DENIED_REPLY.to_string()]
    );
    assert!(tracker.added().is_empty());
}

#[tokio::test]
async fn functional_issue_info_flows_through_rich_reply_path() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store =
        Arc::new(JsonPermissionStore::load_from_dir(tempdir.path()).expect("load store"));
    let tracker = ScriptedTracker::new(Some(sample_issue(42)));
    let messenger = RecordingMessenger::new();
    let registry = build_registry(&store, &tracker, &messenger).expect("build registry");

    registry
        .dispatch(EventKind::Message, &message_from("U100", "!i #42"))
        .await;

    let summaries = messenger.rich_messages();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title.text, "Issue #42: Fix the build matrix");
    assert_eq!(
        summaries[0].title.url,
        "https://github.com/octo/widgets/issues/42"
    );
    assert_eq!(summaries[0].color, "#2cbe4e");
    assert!(messenger.plain_messages().is_empty());
}

#[tokio::test]
async fn regression_unmatched_chatter_leaves_no_trace() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let store =
        Arc::new(JsonPermissionStore::load_from_dir(tempdir.path()).expect("load store"));
    let tracker = ScriptedTracker::new(None);
    let messenger = RecordingMessenger::new();
    let registry = build_registry(&store, &tracker, &messenger).expect("build registry");

    registry
        .dispatch(
            EventKind::Message,
            &message_from("U100", "morning all, standup in five"),
        )
        .await;

    assert!(messenger.plain_messages().is_empty());
    assert!(messenger.rich_messages().is_empty());
    assert!(tracker.added().is_empty());
    assert!(store.issue_actions().await.is_empty());
    // The store only writes on mutation, so the file must not exist yet.
    assert!(!tempdir.path().join("permissions.json").exists());
}
