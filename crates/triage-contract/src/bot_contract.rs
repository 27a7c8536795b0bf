use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `EventKind` values.
pub enum EventKind {
    Message,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
        }
    }
}

/// Chat message payload delivered by the transport, one per inbound event.
///
/// `subtype` is carried through untouched: a populated subtype marks a
/// system/edit event and every command refuses it during eligibility checks.
/// `thread_id` is the timestamp replies should thread under (the event's
/// `thread_ts` when present, otherwise its own `ts`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

/// A piece of display text with an optional hyperlink target.
///
/// An empty `url` renders as bare text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkableText {
    pub text: String,
    pub url: String,
}

impl LinkableText {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }

    /// Text with no link target.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `FieldLayout` values.
pub enum FieldLayout {
    Short,
    Long,
}

/// One titled field inside a rich reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichField {
    pub title: String,
    pub values: Vec<LinkableText>,
    pub layout: FieldLayout,
}

/// A structured chat reply: linked title, state color, author attribution,
/// and a list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichMessage {
    pub title: LinkableText,
    pub color: String,
    pub author: LinkableText,
    pub fields: Vec<RichField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `IssueAction` values.
pub enum IssueAction {
    Close,
}

impl IssueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Close => "close",
        }
    }
}

/// A queued request for out-of-band processing against an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueActionRequest {
    pub issue_number: String,
    pub action: IssueAction,
}

/// Issue author as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueAuthor {
    pub login: String,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A label attached to an issue.
pub struct IssueLabel {
    pub name: String,
}

/// Assignee entry on an issue, linked to the user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueAssignee {
    pub login: String,
    #[serde(default)]
    pub html_url: String,
}

/// Full issue record fetched from the tracker.
///
/// Field names mirror the tracker wire format so clients deserialize straight
/// into this shape. `pull_request` stays opaque: only its presence matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedIssue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    pub user: IssueAuthor,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
    #[serde(default)]
    pub assignees: Vec<IssueAssignee>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl TrackedIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Sends replies back to the channel a payload arrived on.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, text: &str, payload: &IncomingMessage) -> Result<()>;

    async fn send_rich_message(
        &self,
        message: &RichMessage,
        payload: &IncomingMessage,
    ) -> Result<()>;
}

/// Read/mutate access to the issue tracker for one configured repository.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn fetch_issue(&self, number: &str) -> Result<TrackedIssue>;

    /// Names of every label the repository accepts, CLA-status labels excluded.
    async fn repository_labels(&self) -> Result<Vec<String>>;

    async fn issue_labels(&self, number: &str) -> Result<Vec<String>>;

    async fn add_labels(&self, number: &str, labels: &[String]) -> Result<()>;

    async fn remove_labels(&self, number: &str, labels: &[String]) -> Result<()>;
}

/// Permission checks and grants, keyed by chat user id.
///
/// Tokens are stored per user as `token -> bool`; an absent key reads as
/// `false`. None of the operations error on unknown users or tokens.
#[async_trait]
pub trait PermissionAuthority: Send + Sync {
    /// Tokens currently `true` for the user, in the store's stable order.
    async fn permissions_for(&self, user_id: &str) -> Result<Vec<String>>;

    async fn add_permissions(&self, user_id: &str, tokens: &[String]) -> Result<()>;

    async fn remove_permissions(&self, user_id: &str, tokens: &[String]) -> Result<()>;

    /// True when the user holds at least one of `tokens`.
    async fn has_any_permission(&self, user_id: &str, tokens: &[&str]) -> Result<bool>;
}

/// Accepts issue action requests for later out-of-band processing.
#[async_trait]
pub trait IssueActionQueue: Send + Sync {
    async fn enqueue_issue_action(&self, request: IssueActionRequest) -> Result<()>;
}
