use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::types::{
    CreatePullRequestDetails, DiffPayload, MergeDetails, PullRequestCollection, PullRequestQuery,
    RawPullRequest, RawRepository, ReviewDetails, UpdateReviewersDetails,
};
use super::{DevOpsGateway, GatewayError, ProviderError};
use crate::config::ClientSettings;

const USER_AGENT: &str = concat!("devops-pr/", env!("CARGO_PKG_VERSION"));
const REQUEST_ID_HEADER: &str = "opc-request-id";
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Error body the service sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ServiceErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// `DevOpsGateway` over the provider's REST API.
#[derive(Debug, Clone)]
pub struct HttpDevOpsGateway {
    client: Client,
    base_url: Url,
    token: String,
    retries: u32,
}

impl HttpDevOpsGateway {
    pub fn new(settings: &ClientSettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::remote("build_client", ProviderError::Transport(e)))?;

        Ok(Self {
            client,
            base_url: settings.endpoint.clone(),
            token: settings.token.clone(),
            retries: settings.retries,
        })
    }

    /// Append path segments to the endpoint, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn pull_request_url(&self, repository_id: &str, pull_request_id: &str, tail: &[&str]) -> Url {
        let mut segments = vec!["repositories", repository_id, "pullRequests", pull_request_id];
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    /// GET with the configured retry budget.
    async fn read<T: DeserializeOwned>(&self, operation: &'static str, url: Url) -> Result<T, GatewayError> {
        self.execute(operation, self.retries, || self.client.get(url.clone()))
            .await
    }

    /// Send the request built by `build`, rebuilding it for each attempt.
    /// Only transient failures are retried, at most `retries` times.
    async fn execute<T, F>(
        &self,
        operation: &'static str,
        retries: u32,
        build: F,
    ) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let error = match build().bearer_auth(&self.token).send().await {
                Ok(response) if response.status().is_success() => {
                    return decode(operation, response).await;
                }
                Ok(response) => service_error(response).await,
                Err(e) => transport_error(e),
            };

            if attempt <= retries && is_transient(&error) {
                warn!(operation, attempt, error = %error, "transient failure, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                continue;
            }
            return Err(GatewayError::remote(operation, error));
        }
    }
}

async fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> Result<T, GatewayError> {
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::remote(operation, transport_error(e)))?;
    debug!(operation, body_bytes = body.len(), "received response");
    serde_json::from_str(&body).map_err(|e| GatewayError::malformed(operation, e.to_string()))
}

async fn service_error(response: Response) -> ProviderError {
    let status = response.status();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    let parsed: ServiceErrorBody = serde_json::from_str(&body).unwrap_or_default();

    let code = parsed
        .code
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
    let message = parsed.message.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "no response body".to_string()
        } else {
            trimmed.to_string()
        }
    });

    ProviderError::Service {
        status: status.as_u16(),
        code,
        message,
        request_id,
    }
}

fn transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(error)
    }
}

fn is_transient(error: &ProviderError) -> bool {
    match error {
        ProviderError::Timeout => true,
        ProviderError::Transport(e) => e.is_connect(),
        ProviderError::Service { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
        }
    }
}

#[async_trait]
impl DevOpsGateway for HttpDevOpsGateway {
    #[instrument(skip(self))]
    async fn list_pull_requests(
        &self,
        repository_id: &str,
        query: &PullRequestQuery,
    ) -> Result<Vec<RawPullRequest>, GatewayError> {
        let url = self.url(&["repositories", repository_id, "pullRequests"]);
        let collection: PullRequestCollection = self
            .execute("list_pull_requests", self.retries, || {
                self.client.get(url.clone()).query(query)
            })
            .await?;
        debug!(count = collection.items.len(), "listed pull requests");
        Ok(collection.items)
    }

    #[instrument(skip(self))]
    async fn get_pull_request(
        &self,
        repository_id: &str,
        pull_request_id: &str,
    ) -> Result<RawPullRequest, GatewayError> {
        let url = self.pull_request_url(repository_id, pull_request_id, &[]);
        self.read("get_pull_request", url).await
    }

    #[instrument(skip(self))]
    async fn get_commit_diff(
        &self,
        repository_id: &str,
        pull_request_id: &str,
    ) -> Result<DiffPayload, GatewayError> {
        let url = self.pull_request_url(repository_id, pull_request_id, &["diff"]);
        self.read("get_commit_diff", url).await
    }

    #[instrument(skip(self))]
    async fn get_repository(&self, repository_id: &str) -> Result<RawRepository, GatewayError> {
        let url = self.url(&["repositories", repository_id]);
        self.read("get_repository", url).await
    }

    #[instrument(skip(self, details), fields(reviewers = details.reviewers.len()))]
    async fn update_reviewers(
        &self,
        repository_id: &str,
        pull_request_id: &str,
        details: &UpdateReviewersDetails,
    ) -> Result<RawPullRequest, GatewayError> {
        let url = self.pull_request_url(repository_id, pull_request_id, &[]);
        self.execute("update_reviewers", 0, || self.client.put(url.clone()).json(details))
            .await
    }

    #[instrument(skip(self))]
    async fn approve(
        &self,
        repository_id: &str,
        pull_request_id: &str,
    ) -> Result<RawPullRequest, GatewayError> {
        let url = self.pull_request_url(repository_id, pull_request_id, &["actions", "review"]);
        let body = ReviewDetails::approve();
        self.execute("approve", 0, || self.client.post(url.clone()).json(&body))
            .await
    }

    #[instrument(skip(self, details))]
    async fn merge(
        &self,
        repository_id: &str,
        pull_request_id: &str,
        details: &MergeDetails,
    ) -> Result<RawPullRequest, GatewayError> {
        let url = self.pull_request_url(repository_id, pull_request_id, &["actions", "merge"]);
        self.execute("merge", 0, || self.client.post(url.clone()).json(details))
            .await
    }

    #[instrument(skip(self, details), fields(source = %details.source_branch, target = %details.destination_branch))]
    async fn create(
        &self,
        repository_id: &str,
        details: &CreatePullRequestDetails,
    ) -> Result<RawPullRequest, GatewayError> {
        let url = self.url(&["repositories", repository_id, "pullRequests"]);
        self.execute("create", 0, || self.client.post(url.clone()).json(details))
            .await
    }
}
