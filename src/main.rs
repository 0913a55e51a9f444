mod config;
mod devops;
mod error;
mod pr;
mod report;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::{debug, error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use crate::devops::{DevOpsGateway, HttpDevOpsGateway};
use crate::error::AppError;
use crate::pr::{NewPullRequest, PullRequestFilter, PullRequestService, RepositoryResolver};

/// devops-pr: list, approve, merge, and create pull requests on a cloud
/// DevOps source-control service.
#[derive(Parser, Debug)]
#[command(name = "devops-pr", version, about)]
struct Cli {
    /// Log to stderr at debug level and show full error details
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ./.devops-pr.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Commands for working with pull requests
    #[command(name = "pull-requests", visible_alias = "prs", subcommand)]
    PullRequests(PullRequestCommand),
}

#[derive(Subcommand, Debug)]
enum PullRequestCommand {
    /// List pull requests across one or more repositories
    List {
        /// Repository short names from the [repos] table
        #[arg(required = true, value_name = "REPO")]
        repos: Vec<String>,

        #[arg(long, value_enum, ignore_case = true, default_value = "open")]
        status: StatusArg,

        /// Maximum pull requests per repository
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,

        /// Only pull requests created by this principal
        #[arg(long)]
        author: Option<String>,
    },

    /// Show a single pull request with its diff stats
    Show { repo: String, id: String },

    /// Approve a pull request
    Approve { repo: String, id: String },

    /// Fast-forward merge a pull request and delete its source branch
    Merge { repo: String, id: String },

    /// Open a new pull request
    Create {
        repo: String,

        #[arg(long)]
        title: String,

        /// Branch with the changes
        #[arg(long)]
        source: String,

        /// Branch to merge into (default: the repository's default branch)
        #[arg(long)]
        target: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Open,
    Approved,
    Merged,
    Closed,
    Failed,
}

impl StatusArg {
    fn as_str(self) -> &'static str {
        match self {
            StatusArg::Open => "open",
            StatusArg::Approved => "approved",
            StatusArg::Merged => "merged",
            StatusArg::Closed => "closed",
            StatusArg::Failed => "failed",
        }
    }
}

/// What a command wants printed, and how.
#[derive(Debug, PartialEq, Eq)]
enum Output {
    Plain(String),
    Success(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug;

    match run(cli).await {
        Ok(Output::Plain(text)) => {
            print!("{}", text);
            ExitCode::SUCCESS
        }
        Ok(Output::Success(line)) => {
            println!("{}", line.green());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = ?err, "command failed");
            let message = err.render(debug);
            if err.is_user_error() {
                eprintln!("{}", message.yellow());
            } else {
                eprintln!("{}", message.red());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Output, AppError> {
    let config = config::Config::load(cli.config.as_deref())?;
    init_logging(cli.debug, &config.logging.file).map_err(|e| AppError::unexpected(&e))?;
    info!(
        config = %config.source_display(),
        repositories = config.repos.len(),
        "loaded configuration"
    );

    let settings = config.client_settings()?;
    debug!(endpoint = %settings.endpoint, timeout = ?settings.timeout, retries = settings.retries, "building gateway");
    let gateway = HttpDevOpsGateway::new(&settings)?;
    let service = PullRequestService::new(gateway, RepositoryResolver::new(config.repos.clone()))
        .with_reviewer(config.devops.user_id.clone())
        .with_diff_concurrency(config.devops.diff_concurrency);

    match cli.command {
        Command::PullRequests(command) => execute(&service, command).await,
    }
}

async fn execute<G: DevOpsGateway>(
    service: &PullRequestService<G>,
    command: PullRequestCommand,
) -> Result<Output, AppError> {
    match command {
        PullRequestCommand::List {
            repos,
            status,
            limit,
            author,
        } => {
            let filter = PullRequestFilter::new(status.as_str(), limit, author);
            let listing = service
                .list_pull_requests(&repos, &filter)
                .instrument(info_span!("list", repositories = repos.len()))
                .await?;
            debug!(
                rows = listing.pull_requests.len(),
                skipped = ?listing.skipped_repositories,
                "rendering listing"
            );
            Ok(Output::Plain(report::render_listing(&listing.pull_requests)))
        }
        PullRequestCommand::Show { repo, id } => {
            let pr = service.show(&repo, &id).await?;
            Ok(Output::Plain(report::render_detail(&pr)))
        }
        PullRequestCommand::Approve { repo, id } => {
            let pr = service.approve(&repo, &id).await?;
            Ok(Output::Success(report::render_outcome("Approved", &pr)))
        }
        PullRequestCommand::Merge { repo, id } => {
            let pr = service.merge(&repo, &id).await?;
            Ok(Output::Success(report::render_outcome("Merged", &pr)))
        }
        PullRequestCommand::Create {
            repo,
            title,
            source,
            target,
            description,
        } => {
            let new = NewPullRequest {
                title,
                source_branch: source,
                target_branch: target,
                description,
            };
            let pr = service.create(&repo, &new).await?;
            Ok(Output::Success(report::render_outcome("Created", &pr)))
        }
    }
}

/// With --debug everything goes to stderr; otherwise info and above is
/// appended to the configured log file.
fn init_logging(debug: bool, log_file: &Path) -> std::io::Result<()> {
    if debug {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("debug,hyper=info,hyper_util=info,h2=info,reqwest=info,rustls=info")
        });
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = OpenOptions::new().create(true).append(true).open(log_file)?;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devops::types::{DiffPayload, DiffSummary, RawPullRequest};
    use crate::devops::MockDevOpsGateway;
    use clap::CommandFactory;
    use std::collections::BTreeMap;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_defaults() {
        let cli = parse(&["devops-pr", "pull-requests", "list", "a", "b"]);
        assert!(!cli.debug);
        match cli.command {
            Command::PullRequests(PullRequestCommand::List {
                repos,
                status,
                limit,
                author,
            }) => {
                assert_eq!(repos, vec!["a", "b"]);
                assert_eq!(status, StatusArg::Open);
                assert_eq!(limit, 10);
                assert!(author.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_list_flags_and_global_debug() {
        let cli = parse(&[
            "devops-pr", "prs", "list", "api", "--status", "MERGED", "--limit", "3", "--debug",
        ]);
        assert!(cli.debug);
        match cli.command {
            Command::PullRequests(PullRequestCommand::List { status, limit, .. }) => {
                assert_eq!(status, StatusArg::Merged);
                assert_eq!(limit, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_list_requires_a_repository() {
        assert!(Cli::try_parse_from(["devops-pr", "pull-requests", "list"]).is_err());
    }

    #[test]
    fn test_rejects_zero_limit_and_unknown_status() {
        assert!(Cli::try_parse_from(["devops-pr", "prs", "list", "a", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["devops-pr", "prs", "list", "a", "--status", "draft"]).is_err());
    }

    #[test]
    fn test_create_requires_title_and_source() {
        assert!(Cli::try_parse_from(["devops-pr", "prs", "create", "api", "--title", "t"]).is_err());
        let cli = parse(&[
            "devops-pr", "--config", "/tmp/c.toml", "prs", "create", "api", "--title", "Add login",
            "--source", "feature/login",
        ]);
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/c.toml")));
        match cli.command {
            Command::PullRequests(PullRequestCommand::Create { target, .. }) => {
                assert!(target.is_none())
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_command_renders_only_mapped_repositories() {
        let mut gateway = MockDevOpsGateway::new();
        gateway
            .expect_list_pull_requests()
            .withf(|repo, _| repo == "ocid-a")
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    RawPullRequest {
                        id: "pr-1".to_string(),
                        display_name: "First".to_string(),
                        lifecycle_details: Some("OPEN".to_string()),
                        ..RawPullRequest::default()
                    },
                    RawPullRequest {
                        id: "pr-2".to_string(),
                        display_name: "Second".to_string(),
                        lifecycle_details: Some("OPEN".to_string()),
                        ..RawPullRequest::default()
                    },
                ])
            });
        gateway.expect_get_commit_diff().times(2).returning(|_, _| {
            Ok(DiffPayload {
                summary: Some(DiffSummary {
                    lines_added: 10,
                    lines_deleted: 4,
                    total_changes: Some(14),
                }),
                files: vec![],
            })
        });
        let resolver = RepositoryResolver::new(BTreeMap::from([(
            "a".to_string(),
            "ocid-a".to_string(),
        )]));
        let service = PullRequestService::new(gateway, resolver);

        let cli = parse(&["devops-pr", "prs", "list", "a", "b"]);
        let Command::PullRequests(command) = cli.command;
        let output = execute(&service, command).await.unwrap();

        let Output::Plain(text) = output else {
            panic!("listing should be plain output");
        };
        let rows: Vec<&str> = text
            .lines()
            .filter(|line| line.starts_with("| ") && !line.starts_with("| Title"))
            .collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.contains("14 (+10/-4)")));
    }

    #[tokio::test]
    async fn test_list_command_with_no_mapped_repositories() {
        let service = PullRequestService::new(MockDevOpsGateway::new(), RepositoryResolver::default());
        let cli = parse(&["devops-pr", "prs", "list", "x"]);
        let Command::PullRequests(command) = cli.command;
        let output = execute(&service, command).await.unwrap();
        assert_eq!(output, Output::Plain("No pull requests found.\n".to_string()));
    }

    #[tokio::test]
    async fn test_show_unknown_repository_is_user_error() {
        let service = PullRequestService::new(MockDevOpsGateway::new(), RepositoryResolver::default());
        let cli = parse(&["devops-pr", "prs", "show", "x", "pr-1"]);
        let Command::PullRequests(command) = cli.command;
        let err = execute(&service, command).await.unwrap_err();
        assert!(err.is_user_error());
    }
}
