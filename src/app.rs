//! Orchestration for the three run flavors: local working-tree runs, bot
//! runs against a pull request, and the full redo-all workflow.
//!
//! Data flow is the same everywhere: candidate files pass through staleness
//! resolution, surviving files are extracted into the flattened job map, the
//! scheduler renders against the shared browser, and the reconciler writes
//! each artifact through the run's [`ArtifactStore`].

use crate::api::models::Actor;
use crate::api::{ApiError, GitHubClient};
use crate::config::RunConfig;
use crate::internal::models::JobMap;
use crate::internal::reconcile::{ArtifactStore, LocalStore, RemoteStore};
use crate::internal::report::{RunReporter, RunSummary};
use crate::internal::scheduler::render_all;
use crate::internal::snapshot::extract_jobs;
use crate::internal::stale::{
    CommitInfo, StaleFile, StalenessRange, filter_local, filter_remote, narrow_to_last_bot_commit,
    working_tree_changes,
};
use crate::render::Renderer;
use crate::render::chrome::ChromeRenderer;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Command phrase that triggers a full re-render when the repository owner
/// opens an issue containing it.
pub const REDO_ALL_PHRASE: &str = "msgshot redo all";
/// Branch the redo-all workflow renders onto.
pub const REDO_ALL_BRANCH: &str = "msgshot/redo-all";
const REDO_ALL_PR_TITLE: &str = "Refresh all snapshot screenshots";
const REDO_ALL_PR_BODY: &str =
    "Full re-render of every snapshot screenshot, requested via the redo-all command.";

/// Local run: scan the input root, render what the working tree marks as
/// modified or untracked (everything in `--all` mode), write images to the
/// local output root.
pub async fn run_local(config: &RunConfig) -> Result<RunSummary> {
    let mut reporter = RunReporter::new();

    let modified = if config.render_all {
        HashSet::new()
    } else {
        working_tree_changes().await?
    };
    let candidates = scan_input_root(&config.in_root);
    let stale = filter_local(
        &candidates,
        &modified,
        config.render_all,
        &config.in_root,
        &config.exclude,
    );

    let mut jobs = JobMap::new();
    for file in &stale {
        let text = match tokio::fs::read_to_string(&file.path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(path = %file.path, error = %e, "could not read snapshot file, skipping");
                continue;
            }
        };
        collect_jobs(&text, file, &config.out_root, &mut jobs, &mut reporter);
    }
    reporter.set_jobs(jobs.len());
    tracing::info!(count = jobs.len(), "fetching screenshots from message builder");

    render_and_store(jobs, config.limit.concurrency, &LocalStore, &mut reporter).await?;
    Ok(reporter.finish())
}

/// Bot run against a pull request: diff the inspected commit range, render
/// the snapshots it changed, commit the images back onto the PR branch.
pub async fn run_pull_request(
    config: &RunConfig,
    client: &GitHubClient,
    number: u64,
    bot_login: &str,
) -> Result<RunSummary> {
    let mut reporter = RunReporter::new();

    let pull = client
        .pull_request(number)
        .await
        .context("could not fetch the pull request")?;
    let commits: Vec<CommitInfo> = client
        .pull_request_commits(number)
        .await
        .context("could not list pull request commits")?
        .into_iter()
        .map(|c| CommitInfo {
            sha: c.sha,
            author_login: c.author.map(|a| a.login),
        })
        .collect();

    let base = match narrow_to_last_bot_commit(&commits, bot_login) {
        StalenessRange::UpToDate => {
            tracing::info!(number, "head commit is our own, nothing to render");
            return Ok(reporter.finish());
        }
        StalenessRange::Since(sha) => {
            tracing::info!(number, since = %sha, "only rendering changes pushed after our last commit");
            sha
        }
        StalenessRange::Full => pull.base.sha.clone(),
    };

    let changed = client
        .changed_files(&base, &pull.head.sha)
        .await
        .context("could not diff the pull request")?;
    let stale = filter_remote(
        changed
            .into_iter()
            .filter(|f| f.status != "removed")
            .map(|f| f.filename),
        &config.in_root,
        &config.exclude,
    );

    let jobs = fetch_and_extract(client, &stale, &pull.head.sha, &config.out_root, &mut reporter)
        .await?;
    reporter.set_jobs(jobs.len());
    tracing::info!(count = jobs.len(), "fetching screenshots from message builder");

    let store = RemoteStore::new(client.clone(), pull.head.name.clone());
    render_and_store(jobs, config.limit.concurrency, &store, &mut reporter).await?;
    Ok(reporter.finish())
}

/// Full re-render: branch off the default branch head, render every snapshot
/// in the tree, then open a pull request with the refreshed images.
pub async fn run_redo_all(config: &RunConfig, client: &GitHubClient) -> Result<RunSummary> {
    let mut reporter = RunReporter::new();

    let repository = client
        .repository()
        .await
        .context("could not read repository metadata")?;
    let head_sha = client
        .branch_sha(&repository.default_branch)
        .await
        .context("could not resolve the default branch head")?;

    match client.delete_branch(REDO_ALL_BRANCH).await {
        Ok(()) => tracing::info!(branch = REDO_ALL_BRANCH, "removed stale work branch"),
        Err(ApiError::NotFound) => {}
        Err(e) => return Err(e).context("could not remove the stale work branch"),
    }
    client
        .create_branch(REDO_ALL_BRANCH, &head_sha)
        .await
        .context("could not create the work branch")?;

    let in_prefix = format!("{}/", config.in_root);
    let paths = client
        .tree_paths(&head_sha)
        .await
        .context("could not list the repository tree")?
        .into_iter()
        .filter(|path| path.starts_with(&in_prefix));
    let stale = filter_remote(paths, &config.in_root, &config.exclude);

    let jobs = fetch_and_extract(client, &stale, &head_sha, &config.out_root, &mut reporter).await?;
    reporter.set_jobs(jobs.len());
    tracing::info!(count = jobs.len(), "fetching screenshots from message builder");

    let store = RemoteStore::new(client.clone(), REDO_ALL_BRANCH);
    render_and_store(jobs, config.limit.concurrency, &store, &mut reporter).await?;

    let summary = reporter.finish();
    if summary.written > 0 {
        let pull = client
            .create_pull_request(
                REDO_ALL_PR_TITLE,
                REDO_ALL_BRANCH,
                &repository.default_branch,
                REDO_ALL_PR_BODY,
            )
            .await
            .context("could not open the pull request")?;
        tracing::info!(number = pull.number, "opened pull request");
    }
    Ok(summary)
}

/// Webhook payload slice the bot cares about.
#[derive(Debug, Deserialize)]
pub struct EventPayload {
    pub action: Option<String>,
    pub pull_request: Option<PullRequestRef>,
    pub issue: Option<IssueRef>,
    pub repository: Option<RepositoryRef>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub struct IssueRef {
    pub title: String,
    pub body: Option<String>,
    pub user: Actor,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
    pub owner: Actor,
}

/// True when an opened issue is the repository owner asking for a full
/// re-render.
pub fn is_redo_all_request(title: &str, body: Option<&str>, author: &str, owner: &str) -> bool {
    let mentioned = title.contains(REDO_ALL_PHRASE)
        || body.is_some_and(|b| b.contains(REDO_ALL_PHRASE));
    mentioned && author == owner
}

/// Route a GitHub webhook payload to the matching run. Events that do not
/// trigger a render resolve to an empty summary.
pub async fn run_event(
    config: &RunConfig,
    token: &str,
    bot_login: &str,
    payload_path: &Path,
) -> Result<RunSummary> {
    let text = tokio::fs::read_to_string(payload_path)
        .await
        .with_context(|| format!("could not read event payload {}", payload_path.display()))?;
    let payload: EventPayload =
        serde_json::from_str(&text).context("could not parse the event payload")?;

    let repository = payload
        .repository
        .as_ref()
        .context("event payload carries no repository")?;
    let (owner, repo) = repository
        .full_name
        .split_once('/')
        .context("repository full_name is not owner/name")?;
    let client = GitHubClient::new(token, owner, repo);

    let action = payload.action.as_deref().unwrap_or_default();
    if let Some(pull) = &payload.pull_request {
        if matches!(action, "opened" | "synchronize") {
            return run_pull_request(config, &client, pull.number, bot_login).await;
        }
    } else if let Some(issue) = &payload.issue
        && action == "opened"
        && is_redo_all_request(
            &issue.title,
            issue.body.as_deref(),
            &issue.user.login,
            &repository.owner.login,
        )
    {
        return run_redo_all(config, &client).await;
    }

    tracing::info!(action, "event does not trigger a render, ignoring");
    Ok(RunReporter::new().finish())
}

/// Every file under the input root, path-relative to the working directory
/// like the `git ls-files` output it is matched against.
fn scan_input_root(in_root: &str) -> Vec<String> {
    walkdir::WalkDir::new(in_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect()
}

fn collect_jobs(
    text: &str,
    file: &StaleFile,
    out_root: &str,
    jobs: &mut JobMap,
    reporter: &mut RunReporter,
) {
    let (file_jobs, errors) = extract_jobs(text, &file.path, &file.snapshot, out_root);
    for error in errors {
        reporter.record_malformed();
        tracing::warn!(error = %error, "skipping malformed entry");
    }
    jobs.extend(file_jobs);
}

/// Fetch each surviving snapshot file at `git_ref` and extract its jobs.
async fn fetch_and_extract(
    client: &GitHubClient,
    files: &[StaleFile],
    git_ref: &str,
    out_root: &str,
    reporter: &mut RunReporter,
) -> Result<JobMap> {
    let mut jobs = JobMap::new();
    for file in files {
        let content = client
            .file_content(&file.path, git_ref)
            .await
            .with_context(|| format!("could not fetch {}", file.path))?;
        let text = content
            .text()
            .with_context(|| format!("snapshot {} is not valid UTF-8", file.path))?;
        collect_jobs(&text, file, out_root, &mut jobs, reporter);
    }
    Ok(jobs)
}

/// Launch the shared browser, render the whole job map, and write each
/// artifact through the store. Per-job failures are counted, never fatal.
async fn render_and_store(
    jobs: JobMap,
    limit: usize,
    store: &dyn ArtifactStore,
    reporter: &mut RunReporter,
) -> Result<()> {
    if jobs.is_empty() {
        return Ok(());
    }

    let renderer = ChromeRenderer::launch()
        .await
        .context("failed to launch the headless browser")?;
    let outcomes = render_all(&renderer, jobs, limit).await;
    if let Err(e) = renderer.shutdown().await {
        tracing::warn!(error = %e, "browser shutdown failed");
    }

    for outcome in outcomes {
        match outcome.result {
            Ok(bytes) => match store.store(&outcome.path, &bytes).await {
                Ok(kind) => {
                    reporter.record_written();
                    tracing::info!(path = %outcome.path, ?kind, "stored screenshot");
                }
                Err(e) => {
                    reporter.record_write_failure();
                    tracing::error!(error = %e, "failed to store screenshot");
                }
            },
            Err(_) => reporter.record_render_failure(),
        }
    }
    Ok(())
}
