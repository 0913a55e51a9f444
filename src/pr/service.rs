use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use super::diff::DiffStats;
use super::resolver::RepositoryResolver;
use super::types::{NewPullRequest, PullRequest, PullRequestFilter};
use super::PrError;
use crate::devops::types::Reviewer;
use crate::devops::{
    CreatePullRequestDetails, DevOpsGateway, GatewayError, MergeDetails, UpdateReviewersDetails,
};

const DEFAULT_DIFF_CONCURRENCY: usize = 4;

/// Result of a fan-out listing.
#[derive(Debug, Default)]
pub struct PullRequestListing {
    /// Enriched pull requests in repository order, then provider order.
    pub pull_requests: Vec<PullRequest>,
    /// Requested names that had no configured repository.
    pub skipped_repositories: Vec<String>,
}

/// Pull request operations across configured repositories.
pub struct PullRequestService<G> {
    gateway: G,
    resolver: RepositoryResolver,
    reviewer_id: Option<String>,
    diff_concurrency: usize,
}

impl<G: DevOpsGateway> PullRequestService<G> {
    pub fn new(gateway: G, resolver: RepositoryResolver) -> Self {
        Self {
            gateway,
            resolver,
            reviewer_id: None,
            diff_concurrency: DEFAULT_DIFF_CONCURRENCY,
        }
    }

    /// Principal added to the reviewer list before approving.
    pub fn with_reviewer(mut self, reviewer_id: Option<String>) -> Self {
        self.reviewer_id = reviewer_id;
        self
    }

    pub fn with_diff_concurrency(mut self, limit: usize) -> Self {
        self.diff_concurrency = limit.max(1);
        self
    }

    /// List pull requests across `repositories` and enrich each with diff stats.
    ///
    /// Unknown repository names are logged and skipped. `filter.limit` is
    /// applied by the provider per repository. Any remote failure, while
    /// listing or fetching a diff, aborts the whole listing.
    #[instrument(skip(self, filter), fields(status = %filter.status, limit = filter.limit))]
    pub async fn list_pull_requests(
        &self,
        repositories: &[String],
        filter: &PullRequestFilter,
    ) -> Result<PullRequestListing, PrError> {
        let query = filter.to_remote();
        let mut skipped_repositories = Vec::new();
        let mut collected = Vec::new();

        for name in repositories {
            let repository_id = match self.resolver.resolve(name) {
                Ok(id) => id,
                Err(err) => {
                    info!(repository = %name, error = %err, "skipping repository");
                    skipped_repositories.push(name.clone());
                    continue;
                }
            };

            let records = self
                .gateway
                .list_pull_requests(repository_id, &query)
                .await?;
            debug!(repository = %name, count = records.len(), "listed pull requests");
            for raw in records {
                collected.push(PullRequest::from_raw(
                    raw,
                    name,
                    repository_id,
                    "list_pull_requests",
                )?);
            }
        }

        let pull_requests = self.enrich(collected).await?;
        info!(
            pull_requests = pull_requests.len(),
            skipped = skipped_repositories.len(),
            "listing complete"
        );
        Ok(PullRequestListing {
            pull_requests,
            skipped_repositories,
        })
    }

    /// Fetch diffs with bounded concurrency; `buffered` keeps input order.
    async fn enrich(&self, pull_requests: Vec<PullRequest>) -> Result<Vec<PullRequest>, PrError> {
        let gateway = &self.gateway;
        stream::iter(pull_requests)
            .map(|mut pr| async move {
                let diff = gateway
                    .get_commit_diff(&pr.repository_id, &pr.id)
                    .await
                    .map_err(|err| {
                        warn!(pr = %pr.id, operation = err.operation(), error = %err, "diff fetch failed");
                        err
                    })?;
                let stats = DiffStats::from_payload(&diff).map_err(|err| {
                    warn!(pr = %pr.id, error = %err, "unusable diff");
                    err
                })?;
                pr.apply_diff_stats(stats);
                debug!(pr = %pr.id, total_changes = pr.total_changes, "applied diff stats");
                Ok::<_, PrError>(pr)
            })
            .buffered(self.diff_concurrency)
            .try_collect()
            .await
    }

    #[instrument(skip(self))]
    pub async fn show(&self, repository: &str, pull_request_id: &str) -> Result<PullRequest, PrError> {
        let repository_id = self.resolver.resolve(repository)?;
        let raw = self
            .gateway
            .get_pull_request(repository_id, pull_request_id)
            .await?;
        let mut pr = PullRequest::from_raw(raw, repository, repository_id, "get_pull_request")?;
        let diff = self.gateway.get_commit_diff(repository_id, &pr.id).await?;
        pr.apply_diff_stats(DiffStats::from_payload(&diff)?);
        Ok(pr)
    }

    /// Approve a pull request, first adding the configured reviewer if the
    /// pull request does not list it yet.
    #[instrument(skip(self))]
    pub async fn approve(&self, repository: &str, pull_request_id: &str) -> Result<PullRequest, PrError> {
        let repository_id = self.resolver.resolve(repository)?;

        if let Some(reviewer_id) = &self.reviewer_id {
            let current = self
                .gateway
                .get_pull_request(repository_id, pull_request_id)
                .await?;
            if current.reviewers.iter().any(|r| &r.principal_id == reviewer_id) {
                debug!(reviewer = %reviewer_id, "already a reviewer");
            } else {
                let mut reviewers = current.reviewers;
                reviewers.push(Reviewer::principal(reviewer_id.clone()));
                self.gateway
                    .update_reviewers(
                        repository_id,
                        pull_request_id,
                        &UpdateReviewersDetails { reviewers },
                    )
                    .await?;
                info!(reviewer = %reviewer_id, "added reviewer");
            }
        }

        let raw = self.gateway.approve(repository_id, pull_request_id).await?;
        info!("approved pull request");
        Ok(PullRequest::from_raw(raw, repository, repository_id, "approve")?)
    }

    /// Fast-forward merge, deleting the source branch afterwards.
    #[instrument(skip(self))]
    pub async fn merge(&self, repository: &str, pull_request_id: &str) -> Result<PullRequest, PrError> {
        let repository_id = self.resolver.resolve(repository)?;
        let raw = self
            .gateway
            .get_pull_request(repository_id, pull_request_id)
            .await?;
        let current = PullRequest::from_raw(raw, repository, repository_id, "get_pull_request")?;

        let (Some(source), Some(target)) = (
            current.source_branch.as_deref(),
            current.target_branch.as_deref(),
        ) else {
            return Err(GatewayError::malformed(
                "get_pull_request",
                format!("pull request {} has no source or destination branch", current.id),
            )
            .into());
        };

        let details = MergeDetails::fast_forward(source, target);
        let raw = self
            .gateway
            .merge(repository_id, pull_request_id, &details)
            .await?;
        info!(source, target, "merged pull request");
        Ok(PullRequest::from_raw(raw, repository, repository_id, "merge")?)
    }

    /// Open a pull request. Without an explicit target the repository's
    /// default branch is used.
    #[instrument(skip(self, new), fields(source = %new.source_branch))]
    pub async fn create(&self, repository: &str, new: &NewPullRequest) -> Result<PullRequest, PrError> {
        let repository_id = self.resolver.resolve(repository)?;

        let target = match &new.target_branch {
            Some(branch) => branch.clone(),
            None => self
                .gateway
                .get_repository(repository_id)
                .await?
                .default_branch
                .filter(|branch| !branch.is_empty())
                .ok_or_else(|| PrError::NoDefaultBranch(repository.to_string()))?,
        };
        debug!(target = %target, "resolved target branch");

        let details = CreatePullRequestDetails {
            display_name: new.title.clone(),
            repository_id: repository_id.to_string(),
            source_branch: new.source_branch.clone(),
            destination_branch: target,
            description: new.description.clone(),
        };
        let raw = self.gateway.create(repository_id, &details).await?;
        info!(pr = %raw.id, "created pull request");
        Ok(PullRequest::from_raw(raw, repository, repository_id, "create")?)
    }
}
