//! Gateway to the DevOps source-control service.
//!
//! `DevOpsGateway` is the seam the pull request service talks through; the
//! HTTP implementation lives in `client`.

pub mod client;
pub mod types;

pub use client::HttpDevOpsGateway;
pub use types::{
    CreatePullRequestDetails, DiffPayload, MergeDetails, PullRequestQuery, RawPullRequest,
    RawRepository, UpdateReviewersDetails,
};

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by the provider or the transport underneath it.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("service returned {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("DevOps operation '{operation}' failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("DevOps operation '{operation}' returned a malformed response: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },
}

impl GatewayError {
    pub fn remote(operation: &'static str, source: ProviderError) -> Self {
        GatewayError::Remote { operation, source }
    }

    pub fn malformed(operation: &'static str, reason: impl Into<String>) -> Self {
        GatewayError::MalformedResponse {
            operation,
            reason: reason.into(),
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            GatewayError::Remote { operation, .. } => operation,
            GatewayError::MalformedResponse { operation, .. } => operation,
        }
    }
}

/// Remote operations on a provider repository and its pull requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DevOpsGateway: Send + Sync {
    /// List pull requests matching `query`. The provider applies `limit`.
    async fn list_pull_requests(
        &self,
        repository_id: &str,
        query: &PullRequestQuery,
    ) -> Result<Vec<RawPullRequest>, GatewayError>;

    async fn get_pull_request(
        &self,
        repository_id: &str,
        pull_request_id: &str,
    ) -> Result<RawPullRequest, GatewayError>;

    async fn get_commit_diff(
        &self,
        repository_id: &str,
        pull_request_id: &str,
    ) -> Result<DiffPayload, GatewayError>;

    async fn get_repository(&self, repository_id: &str) -> Result<RawRepository, GatewayError>;

    /// Replace the reviewer list of a pull request.
    async fn update_reviewers(
        &self,
        repository_id: &str,
        pull_request_id: &str,
        details: &UpdateReviewersDetails,
    ) -> Result<RawPullRequest, GatewayError>;

    async fn approve(
        &self,
        repository_id: &str,
        pull_request_id: &str,
    ) -> Result<RawPullRequest, GatewayError>;

    async fn merge(
        &self,
        repository_id: &str,
        pull_request_id: &str,
        details: &MergeDetails,
    ) -> Result<RawPullRequest, GatewayError>;

    async fn create(
        &self,
        repository_id: &str,
        details: &CreatePullRequestDetails,
    ) -> Result<RawPullRequest, GatewayError>;
}
