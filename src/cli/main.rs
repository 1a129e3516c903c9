//! gitsync - manage single files in GitHub and GitLab repositories
//!
//! Usage:
//!   gitsync --url https://github.com/owner/repo read values.yaml
//!   gitsync create env/prod.yaml --file ./prod.yaml --branch release
//!   gitsync update env/prod.yaml --file -
//!   gitsync delete env/prod.yaml
//!   gitsync id env/prod.yaml
//!
//! The URL and token fall back to GITSYNC_URL and GITSYNC_TOKEN, the branch
//! to GITSYNC_BRANCH.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitsync_sdk::cli::commands::{
    handle_create, handle_delete, handle_id, handle_read, handle_update, resolve_content,
};
use gitsync_sdk::config::GitSyncConfig;
use gitsync_sdk::resource::FileSpec;
use gitsync_sdk::Context;

#[derive(Parser)]
#[command(name = "gitsync")]
#[command(about = "Create, read, update and delete files in hosted Git repositories", long_about = None)]
struct Cli {
    /// Repository URL (https://host/owner/repo)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Personal access token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Branch to operate on
    #[arg(long, short, global = true)]
    branch: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log requests and retries
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a file's content
    Read {
        path: String,
        /// Print the file state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a file that does not exist yet
    Create(WriteArgs),
    /// Replace the content of an existing file
    Update(WriteArgs),
    /// Delete a file
    Delete { path: String },
    /// Print the resource ID of a file
    Id { path: String },
}

#[derive(Args)]
struct WriteArgs {
    /// Repository-relative path
    path: String,
    /// Local file with the new content, `-` for stdin
    #[arg(long, short)]
    file: Option<String>,
    /// New content given inline
    #[arg(long, conflicts_with = "file")]
    content: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "gitsync_sdk=debug,info" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<GitSyncConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let document = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            GitSyncConfig::from_toml_str(&document)?
        }
        None => GitSyncConfig::default(),
    };

    if let Some(url) = &cli.url {
        config = config.with_url(url);
    }
    if let Some(token) = &cli.token {
        config = config.with_token(token);
    }
    Ok(config.merge_env())
}

fn spec(args: WriteArgs, branch: &str) -> Result<FileSpec> {
    let content = resolve_content(args.content, args.file.as_deref())?;
    Ok(FileSpec::new(args.path, content).with_branch(branch))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let branch = config.branch_or_default(cli.branch.as_deref()).to_string();

    let (ctx, cancel) = Context::background().with_cancel();
    let ctx = match cli.timeout {
        Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
        None => ctx,
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    let backend = config.connect(&ctx)?;

    match cli.command {
        Commands::Read { path, json } => handle_read(&ctx, &backend, &path, &branch, json).await?,
        Commands::Create(args) => {
            handle_create(&ctx, &backend, spec(args, &branch)?, &branch).await?
        }
        Commands::Update(args) => {
            handle_update(&ctx, &backend, spec(args, &branch)?, &branch).await?
        }
        Commands::Delete { path } => handle_delete(&ctx, &backend, &path, &branch).await?,
        Commands::Id { path } => handle_id(&backend, &path, &branch),
    }

    Ok(())
}
