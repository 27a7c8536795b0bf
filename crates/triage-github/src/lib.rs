//! GitHub REST API client implementing the issue tracker contract.

pub mod github_issue_client;

pub use github_issue_client::GithubIssueClient;
