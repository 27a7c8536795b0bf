//! File-backed permission and issue-action storage.

pub mod permission_store;

pub use permission_store::*;
