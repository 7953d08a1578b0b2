mod cli;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use issue_relay::{BranchType, IssuePublisher, PublishConfig, PublishTarget, Settings};
use scm_review::ProviderClient;
use services::{RetryConfig, WorkerPool};
use sonar_client::SonarClient;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sqpr")]
#[command(
    version,
    about = "Relays SonarQube issues into GitHub pull-request reviews",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for SonarQube webhooks and publish in the background.
    Server(ServerArgs),
    /// Run one cycle for a project/branch and print the pending issues.
    Cli(CliArgs),
}

#[derive(Args)]
struct ServerArgs {
    #[arg(long)]
    port: u16,
    /// Number of background workers.
    #[arg(long, default_value_t = 30)]
    workers: usize,
    /// Total attempts per publish cycle.
    #[arg(long, default_value_t = 5)]
    attempts: u32,
    #[arg(long, default_value_t = 60)]
    retry_delay_secs: u64,
    /// Submit reviews as REQUEST_CHANGES instead of COMMENT.
    #[arg(long)]
    request_changes: bool,
    /// Do not tag published issues.
    #[arg(long)]
    no_mark: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CliArgs {
    #[arg(long)]
    pub project: String,
    /// Branch name, or the PR key with `--branch-type PULL_REQUEST`.
    #[arg(long)]
    pub branch: String,
    #[arg(long, value_enum, default_value_t = BranchTypeArg::Branch)]
    pub branch_type: BranchTypeArg,
    /// Post the review to the pull request.
    #[arg(long)]
    pub publish: bool,
    /// Tag the pending issues as published in SonarQube, with or without `--publish`.
    #[arg(long)]
    pub mark: bool,
    #[arg(long)]
    pub request_changes: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum BranchTypeArg {
    #[value(name = "BRANCH")]
    Branch,
    #[value(name = "PULL_REQUEST")]
    PullRequest,
}

impl From<BranchTypeArg> for BranchType {
    fn from(arg: BranchTypeArg) -> Self {
        match arg {
            BranchTypeArg::Branch => BranchType::Branch,
            BranchTypeArg::PullRequest => BranchType::PullRequest,
        }
    }
}

impl CliArgs {
    pub fn target(&self) -> PublishTarget {
        PublishTarget::new(&self.project, &self.branch, self.branch_type.into())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment wins.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Command::Server(args) => run_server(settings, args).await,
        Command::Cli(args) => cli::run(settings, args).await,
    }
}

async fn run_server(settings: Settings, args: ServerArgs) -> anyhow::Result<()> {
    let secret = settings.require_webhook_secret()?.to_string();
    let tracker = SonarClient::new(&settings.sonar_root_url, &settings.sonar_api_key)?;
    let scm = ProviderClient::from_config(settings.provider_config()?)?;

    let publisher = Arc::new(IssuePublisher::new(
        tracker,
        scm,
        PublishConfig {
            request_changes: args.request_changes,
            mark_as_published: !args.no_mark,
            cycle_timeout: None,
        },
    ));

    let pool = WorkerPool::start(args.workers);
    let retry = RetryConfig::new(args.attempts, Duration::from_secs(args.retry_delay_secs));
    let dispatcher = api::PublishDispatcher::new(publisher, pool.queue(), retry);
    let state = api::AppState::new(secret, Arc::new(dispatcher));

    info!(
        port = args.port,
        workers = pool.size(),
        attempts = retry.attempts,
        "starting sqpr server"
    );

    let served = api::start(args.port, state)
        .await
        .context("webhook server failed");

    info!("draining queued publish cycles");
    pool.shutdown().await;

    served
}
