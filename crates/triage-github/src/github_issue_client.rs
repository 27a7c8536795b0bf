use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use triage_contract::{IssueTracker, TrackedIssue};

const GITHUB_API_VERSION: &str = "2022-11-28";
const CLA_LABEL_PREFIX: &str = "cla:";

#[derive(Debug, Clone, Deserialize)]
struct LabelRow {
    name: String,
}

/// REST client bound to one `owner/repo`, implementing [`IssueTracker`].
///
/// Every call is a single request: upstream failures surface as errors and
/// are never retried here.
#[derive(Clone)]
pub struct GithubIssueClient {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
}

impl GithubIssueClient {
    pub fn new(
        api_base: impl Into<String>,
        token: &str,
        owner: impl Into<String>,
        repo: impl Into<String>,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("triage-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static(GITHUB_API_VERSION),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    fn issue_url(&self, number: &str) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}",
            self.api_base, self.owner, self.repo, number
        )
    }

    async fn request_json<T>(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .with_context(|| format!("github api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "github api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode github {operation}"))
    }

    async fn request_success(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
        allow_missing: bool,
    ) -> Result<()> {
        let response = request
            .send()
            .await
            .with_context(|| format!("github api {operation} request failed"))?;
        let status = response.status();
        if status.is_success() || (allow_missing && status == reqwest::StatusCode::NOT_FOUND) {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        bail!(
            "github api {operation} failed with status {}: {}",
            status.as_u16(),
            truncate_for_error(&body, 800)
        );
    }

    async fn collect_label_names(&self, url: &str, operation: &str) -> Result<Vec<String>> {
        let mut page = 1_u32;
        let mut names = Vec::new();
        loop {
            let page_value = page.to_string();
            let rows: Vec<LabelRow> = self
                .request_json(
                    operation,
                    self.http
                        .get(url)
                        .query(&[("per_page", "100"), ("page", page_value.as_str())]),
                )
                .await?;
            let row_count = rows.len();
            names.extend(rows.into_iter().map(|row| row.name));
            if row_count < 100 {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(names)
    }
}

#[async_trait]
impl IssueTracker for GithubIssueClient {
    async fn fetch_issue(&self, number: &str) -> Result<TrackedIssue> {
        self.request_json("fetch issue", self.http.get(self.issue_url(number)))
            .await
    }

    async fn repository_labels(&self) -> Result<Vec<String>> {
        let url = format!(
            "{}/repos/{}/{}/labels",
            self.api_base, self.owner, self.repo
        );
        let names = self
            .collect_label_names(&url, "list repository labels")
            .await?;
        Ok(names
            .into_iter()
            .filter(|name| !name.starts_with(CLA_LABEL_PREFIX))
            .collect())
    }

    async fn issue_labels(&self, number: &str) -> Result<Vec<String>> {
        let url = format!("{}/labels", self.issue_url(number));
        self.collect_label_names(&url, "list issue labels").await
    }

    async fn add_labels(&self, number: &str, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let payload = json!({ "labels": labels });
        self.request_success(
            "add issue labels",
            self.http
                .post(format!("{}/labels", self.issue_url(number)))
                .json(&payload),
            false,
        )
        .await
    }

    async fn remove_labels(&self, number: &str, labels: &[String]) -> Result<()> {
        let removals = labels.iter().map(|label| {
            let url = format!(
                "{}/labels/{}",
                self.issue_url(number),
                percent_encode_path_segment(label)
            );
            // Removing a label the issue does not carry is not an error.
            self.request_success("remove issue label", self.http.delete(url), true)
        });
        for result in join_all(removals).await {
            result?;
        }
        Ok(())
    }
}

fn percent_encode_path_segment(value: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut encoded = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        let is_unreserved = matches!(
            byte,
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~'
        );
        if is_unreserved {
            encoded.push(*byte as char);
        } else {
            encoded.push('%');
            encoded.push(HEX[(byte >> 4) as usize] as char);
            encoded.push(HEX[(byte & 0x0F) as usize] as char);
        }
    }
    encoded
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
