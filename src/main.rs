use anyhow::{Context, Result};
use clap::Parser;
use msgshot::api::GitHubClient;
use msgshot::app;
use msgshot::cli::{Cli, Commands};
use msgshot::config::RunConfig;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG takes precedence; default to our own info-level logs.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("msgshot=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let config = RunConfig::load_manifest(Path::new(".")).and_then(|manifest| {
        RunConfig::resolve(manifest, cli.in_root.clone(), cli.out_root.clone(), cli.all)
    });
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            // Configuration problems abort before any work starts.
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let summary = match &cli.command {
        None => app::run_local(&config).await?,
        Some(Commands::Event { payload }) => {
            let token = require_token(&cli)?;
            app::run_event(&config, &token, &cli.bot_login, payload).await?
        }
        Some(Commands::RedoAll { repo }) => {
            let token = require_token(&cli)?;
            let (owner, name) = repo
                .split_once('/')
                .context("--repo must be owner/name")?;
            let client = GitHubClient::new(token, owner, name);
            app::run_redo_all(&config, &client).await?
        }
    };

    println!("msgshot {summary}");
    Ok(())
}

fn require_token(cli: &Cli) -> Result<String> {
    cli.token
        .clone()
        .context("a GitHub token is required for bot mode (set --token or GITHUB_TOKEN)")
}
