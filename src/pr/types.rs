use chrono::{DateTime, Utc};

use super::diff::DiffStats;
use crate::devops::{GatewayError, PullRequestQuery, RawPullRequest};

/// Lifecycle detail assumed when the provider omits one.
pub const DEFAULT_STATUS: &str = "OPEN";
pub const DEFAULT_LIMIT: u32 = 10;

/// A pull request ready for presentation.
/// Note: not Deserialize; built from a `RawPullRequest` by `from_raw`,
/// which validates the fields the rest of the tool relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    /// Provider pull request id
    pub id: String,
    pub title: String,
    /// Provider lifecycle detail, e.g. OPEN or MERGED
    pub status: String,
    pub author: Option<String>,
    /// Short name the pull request was requested under
    pub repository_name: String,
    /// Provider id the short name resolved to
    pub repository_id: String,
    pub source_branch: Option<String>,
    pub target_branch: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub total_changes: u64,
}

impl PullRequest {
    /// Validate a provider record and attach the repository it was listed under.
    pub fn from_raw(
        raw: RawPullRequest,
        repository_name: &str,
        repository_id: &str,
        operation: &'static str,
    ) -> Result<PullRequest, GatewayError> {
        if raw.id.trim().is_empty() {
            return Err(GatewayError::malformed(operation, "pull request without an id"));
        }
        if raw.display_name.trim().is_empty() {
            return Err(GatewayError::malformed(
                operation,
                format!("pull request {} has no title", raw.id),
            ));
        }

        Ok(PullRequest {
            id: raw.id,
            title: raw.display_name,
            status: raw
                .lifecycle_details
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            author: raw.created_by,
            repository_name: repository_name.to_string(),
            repository_id: repository_id.to_string(),
            source_branch: raw.source_branch,
            target_branch: raw.destination_branch,
            created_at: raw.time_created,
            updated_at: raw.time_updated,
            lines_added: 0,
            lines_deleted: 0,
            total_changes: 0,
        })
    }

    pub fn apply_diff_stats(&mut self, stats: DiffStats) {
        self.lines_added = stats.lines_added;
        self.lines_deleted = stats.lines_deleted;
        self.total_changes = stats.total_changes;
    }
}

/// Criteria for listing pull requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestFilter {
    /// Upper-cased lifecycle detail; the provider filters on upper case.
    pub status: String,
    pub limit: u32,
    pub author: Option<String>,
}

impl Default for PullRequestFilter {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS, DEFAULT_LIMIT, None)
    }
}

impl PullRequestFilter {
    pub fn new(status: &str, limit: u32, author: Option<String>) -> Self {
        Self {
            status: status.trim().to_uppercase(),
            limit,
            author,
        }
    }

    /// Translate into the list endpoint's query parameters.
    pub fn to_remote(&self) -> PullRequestQuery {
        PullRequestQuery {
            lifecycle_details: Some(self.status.clone()),
            limit: Some(self.limit),
            created_by: self.author.clone(),
        }
    }
}

/// New pull request as requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub source_branch: String,
    /// Falls back to the repository's default branch.
    pub target_branch: Option<String>,
    pub description: Option<String>,
}
