//! Wire records exchanged with the DevOps REST API.
//!
//! These mirror the provider's JSON shapes. Conversion into domain types
//! happens in `crate::pr`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query parameters accepted by the pull request list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// A pull request as returned by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub lifecycle_details: Option<String>,
    pub created_by: Option<String>,
    pub source_branch: Option<String>,
    pub destination_branch: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    pub time_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
}

/// Envelope of a list call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestCollection {
    pub items: Vec<RawPullRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    pub principal_id: String,
    #[serde(default, skip_serializing)]
    pub principal_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
}

impl Reviewer {
    pub fn principal(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            principal_name: None,
            status: None,
        }
    }
}

/// Diff of a pull request: either a precomputed summary, a per-file list,
/// or both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffPayload {
    pub summary: Option<DiffSummary>,
    #[serde(default)]
    pub files: Vec<DiffFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_deleted: u64,
    pub total_changes: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffFile {
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_deleted: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRepository {
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewersDetails {
    pub reviewers: Vec<Reviewer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetails {
    pub action: String,
}

impl ReviewDetails {
    pub fn approve() -> Self {
        Self {
            action: "APPROVE".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDetails {
    pub action_type: String,
    pub merge_strategy: String,
    pub commit_message: String,
    pub post_merge_action: String,
}

impl MergeDetails {
    /// Fast-forward merge that deletes the source branch afterwards.
    pub fn fast_forward(source_branch: &str, target_branch: &str) -> Self {
        Self {
            action_type: "EXECUTE".to_string(),
            merge_strategy: "FAST_FORWARD_ONLY".to_string(),
            commit_message: format!(
                "Merge pull request from {} to {}",
                source_branch, target_branch
            ),
            post_merge_action: "DELETE_SOURCE_BRANCH".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePullRequestDetails {
    pub display_name: String,
    pub repository_id: String,
    pub source_branch: String,
    pub destination_branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
