pub mod diff;
pub mod resolver;
pub mod service;
pub mod types;

pub use resolver::RepositoryResolver;
pub use service::PullRequestService;
pub use types::{NewPullRequest, PullRequest, PullRequestFilter};

use thiserror::Error;

use crate::devops::GatewayError;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("Repository '{0}' not found in configuration")]
    RepositoryNotFound(String),

    #[error("Repository '{0}' has no default branch")]
    NoDefaultBranch(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
