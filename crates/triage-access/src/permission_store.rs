use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use triage_contract::{IssueActionQueue, IssueActionRequest, PermissionAuthority};
use triage_core::{current_unix_timestamp_ms, write_text_atomic};

const PERMISSION_STORE_SCHEMA_VERSION: u32 = 1;
const PERMISSION_STORE_FILE_NAME: &str = "permissions.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PermissionStoreState {
    schema_version: u32,
    #[serde(default)]
    users: BTreeMap<String, BTreeMap<String, bool>>,
    #[serde(default)]
    issue_actions: Vec<IssueActionRecord>,
}

impl Default for PermissionStoreState {
    fn default() -> Self {
        Self {
            schema_version: PERMISSION_STORE_SCHEMA_VERSION,
            users: BTreeMap::new(),
            issue_actions: Vec::new(),
        }
    }
}

/// One queued issue action, persisted until an out-of-band worker drains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueActionRecord {
    pub issue_number: String,
    pub action: String,
    pub requested_unix_ms: u64,
}

/// Permission and issue-action store backed by a single JSON file.
///
/// Every user's record maps token -> bool; revoking stores `false` rather
/// than deleting the key, so an absent key and an explicit `false` read the
/// same. Each operation locks, mutates, and saves as one unit, which is the
/// only per-user serialization this system provides.
#[derive(Debug)]
pub struct JsonPermissionStore {
    path: PathBuf,
    state: Mutex<PermissionStoreState>,
}

impl JsonPermissionStore {
    pub fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read permission store {}", path.display()))?;
            serde_json::from_str::<PermissionStoreState>(&raw)
                .with_context(|| format!("failed to parse permission store {}", path.display()))?
        } else {
            PermissionStoreState::default()
        };

        if state.schema_version != PERMISSION_STORE_SCHEMA_VERSION {
            bail!(
                "unsupported permission store schema: expected {}, found {}",
                PERMISSION_STORE_SCHEMA_VERSION,
                state.schema_version
            );
        }

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn load_from_dir(state_dir: &Path) -> Result<Self> {
        Self::load(state_dir.join(PERMISSION_STORE_FILE_NAME))
    }

    /// Snapshot of the queued issue actions, oldest first.
    pub async fn issue_actions(&self) -> Vec<IssueActionRecord> {
        self.state.lock().await.issue_actions.clone()
    }

    fn save_state(&self, state: &PermissionStoreState) -> Result<()> {
        let mut payload =
            serde_json::to_string_pretty(state).context("failed to serialize permission store")?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload)
            .with_context(|| format!("failed to write permission store {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl PermissionAuthority for JsonPermissionStore {
    async fn permissions_for(&self, user_id: &str) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let Some(record) = state.users.get(user_id) else {
            return Ok(Vec::new());
        };
        Ok(record
            .iter()
            .filter(|(_, held)| **held)
            .map(|(token, _)| token.clone())
            .collect())
    }

    async fn add_permissions(&self, user_id: &str, tokens: &[String]) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        let record = state.users.entry(user_id.to_string()).or_default();
        for token in tokens {
            record.insert(token.clone(), true);
        }
        self.save_state(&state)
    }

    async fn remove_permissions(&self, user_id: &str, tokens: &[String]) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        let record = state.users.entry(user_id.to_string()).or_default();
        for token in tokens {
            record.insert(token.clone(), false);
        }
        self.save_state(&state)
    }

    async fn has_any_permission(&self, user_id: &str, tokens: &[&str]) -> Result<bool> {
        let state = self.state.lock().await;
        let Some(record) = state.users.get(user_id) else {
            return Ok(false);
        };
        Ok(tokens
            .iter()
            .any(|token| record.get(*token).copied().unwrap_or(false)))
    }
}

#[async_trait]
impl IssueActionQueue for JsonPermissionStore {
    async fn enqueue_issue_action(&self, request: IssueActionRequest) -> Result<()> {
        let mut state = self.state.lock().await;
        state.issue_actions.push(IssueActionRecord {
            issue_number: request.issue_number,
            action: request.action.as_str().to_string(),
            requested_unix_ms: current_unix_timestamp_ms(),
        });
        self.save_state(&state)
    }
}
