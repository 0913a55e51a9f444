//! Classification of internal errors into what the user gets to see.
//!
//! User errors carry remediation steps. System and unexpected errors show a
//! short message unless `--debug` is set, in which case the full diagnostic
//! is appended.

use thiserror::Error;

use crate::config::{ConfigError, DEFAULT_CONFIG_FILE, TOKEN_ENV_VAR};
use crate::devops::{GatewayError, ProviderError};
use crate::pr::PrError;

const DEBUG_HINT: &str = "Run with --debug for more information.";

#[derive(Debug, Error)]
pub enum AppError {
    /// Something the user can fix.
    #[error("{message}")]
    User {
        message: String,
        fix: Option<String>,
    },
    /// Failure on the service side or in transport.
    #[error("{message}")]
    System { message: String, detail: String },
    /// Anything not classified above.
    #[error("{message}")]
    Unexpected { message: String, detail: String },
}

impl AppError {
    fn user(message: impl Into<String>, fix: impl Into<String>) -> Self {
        AppError::User {
            message: message.into(),
            fix: Some(fix.into()),
        }
    }

    pub fn unexpected<E: std::error::Error>(error: &E) -> Self {
        AppError::Unexpected {
            message: error.to_string(),
            detail: format!("{error:?}"),
        }
    }

    pub fn is_user_error(&self) -> bool {
        matches!(self, AppError::User { .. })
    }

    /// Text shown on stderr. Never includes Rust type names unless `debug`.
    pub fn render(&self, debug: bool) -> String {
        match self {
            AppError::User { message, fix } => match fix {
                Some(fix) => format!("{message}\n\nTo fix this issue:\n{fix}"),
                None => message.clone(),
            },
            AppError::System { message, detail } | AppError::Unexpected { message, detail } => {
                if debug {
                    format!("{message}\n\nDebug information: {detail}")
                } else {
                    format!("{message}\n\n{DEBUG_HINT}")
                }
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        let fix = match &err {
            ConfigError::FileRead { .. } => format!(
                "Check the path given to --config, or create {DEFAULT_CONFIG_FILE} in the current directory."
            ),
            ConfigError::Parse { path, .. } => {
                format!("Fix the TOML syntax in {}.", path.display())
            }
            ConfigError::MissingEndpoint | ConfigError::InvalidEndpoint { .. } => {
                "Set `endpoint` under [devops] in the config file to the service base URL.".to_string()
            }
            ConfigError::MissingToken => format!(
                "Set `token` under [devops] in the config file, or export {TOKEN_ENV_VAR}."
            ),
        };
        AppError::user(err.to_string(), fix)
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let detail = format!("{err:?}");
        match &err {
            GatewayError::Remote {
                source: ProviderError::Service { status: 401, .. },
                ..
            } => AppError::user(
                "The DevOps service rejected your credentials.",
                format!(
                    "Refresh your session token, then update `token` in the config file or {TOKEN_ENV_VAR}."
                ),
            ),
            GatewayError::Remote {
                operation,
                source: ProviderError::Service { status: 404, .. },
            } => AppError::user(
                format!("The DevOps service could not find what '{operation}' asked for."),
                "Check the repository ids under [repos] and the pull request id.",
            ),
            GatewayError::Remote {
                operation,
                source: ProviderError::Timeout,
            } => AppError::System {
                message: format!("The DevOps service did not answer '{operation}' in time."),
                detail,
            },
            GatewayError::Remote { operation, .. } => AppError::System {
                message: format!("The DevOps service request '{operation}' failed."),
                detail,
            },
            GatewayError::MalformedResponse { operation, .. } => AppError::System {
                message: format!("The DevOps service sent an unexpected response to '{operation}'."),
                detail,
            },
        }
    }
}

impl From<PrError> for AppError {
    fn from(err: PrError) -> Self {
        match err {
            PrError::RepositoryNotFound(name) => AppError::user(
                format!("Repository '{name}' not found in configuration."),
                format!("Add `{name} = \"<repository id>\"` under [repos] in the config file."),
            ),
            PrError::NoDefaultBranch(name) => AppError::user(
                format!("Repository '{name}' has no default branch."),
                "Pass the target branch explicitly with --target.",
            ),
            PrError::Gateway(err) => err.into(),
        }
    }
}
