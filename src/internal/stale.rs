//! Staleness resolution: which candidate snapshot files actually need a
//! fresh render. Two variants share the "candidates in, files requiring
//! render out" contract and differ only in their staleness signal: the local
//! working tree's modified/untracked set, or a pull request's changed-file
//! list over the inspected commit range.

use crate::internal::snapshot::SnapshotPath;
use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// A candidate that survived resolution, with its parsed identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleFile {
    /// Path as the caller will read it: working-tree relative locally,
    /// repository relative remotely.
    pub path: String,
    pub snapshot: SnapshotPath,
}

/// Local working-tree variant: keep `.snap` files under the input root that
/// are in the modified/untracked set (or everything in `render_all` mode) and
/// whose test name is not excluded. Pattern mismatches drop the file.
pub fn filter_local(
    candidates: &[String],
    modified: &HashSet<String>,
    render_all: bool,
    in_root: &str,
    exclude: &[String],
) -> Vec<StaleFile> {
    candidates
        .iter()
        .filter(|path| path.ends_with(".snap"))
        .filter(|path| render_all || modified.contains(*path))
        .filter_map(|path| {
            let rel = strip_root(path, in_root)?;
            let snapshot = SnapshotPath::parse(rel)?;
            Some(StaleFile {
                path: path.clone(),
                snapshot,
            })
        })
        .filter(|file| !exclude.iter().any(|t| t == &file.snapshot.test))
        .collect()
}

/// Remote variant: keep `.snap` paths from a changed-file list, relativizing
/// the group to the input root for output naming. The exclude list matches
/// case-insensitively here since test names flow in from another repository.
pub fn filter_remote<I>(changed: I, in_root: &str, exclude: &[String]) -> Vec<StaleFile>
where
    I: IntoIterator<Item = String>,
{
    changed
        .into_iter()
        .filter(|path| path.ends_with(".snap"))
        .filter_map(|path| {
            let rel = strip_root(&path, in_root).unwrap_or(&path);
            let snapshot = SnapshotPath::parse(rel)?;
            Some(StaleFile { path, snapshot })
        })
        .filter(|file| {
            !exclude
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&file.snapshot.test))
        })
        .collect()
}

/// One pull-request commit as seen by the resolver, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub author_login: Option<String>,
}

/// Which commit range still needs rendering, judged from the position of the
/// most recent bot-authored commit in the ordered history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StalenessRange {
    /// The bot's commit is already the newest; the run is a no-op.
    UpToDate,
    /// Humans pushed after the bot; diff from the bot's commit to head.
    Since(String),
    /// No bot commit yet; diff the full base-to-head range.
    Full,
}

/// Pure re-basing rule over an ordered commit list: find the most recent
/// commit authored by the bot itself and narrow the staleness range to start
/// there, so already-rendered changes are not re-rendered.
pub fn narrow_to_last_bot_commit(commits: &[CommitInfo], bot_login: &str) -> StalenessRange {
    match commits
        .iter()
        .rposition(|c| c.author_login.as_deref() == Some(bot_login))
    {
        Some(i) if i + 1 == commits.len() => StalenessRange::UpToDate,
        Some(i) => StalenessRange::Since(commits[i].sha.clone()),
        None => StalenessRange::Full,
    }
}

/// Modified-or-untracked paths of the working tree, repo-root relative.
pub async fn working_tree_changes() -> Result<HashSet<String>> {
    let output = tokio::process::Command::new("git")
        .args(["ls-files", "--modified", "--others", "--exclude-standard"])
        .output()
        .await
        .context("failed to run `git ls-files`")?;

    if !output.status.success() {
        bail!(
            "`git ls-files` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return Some(path);
    }
    path.strip_prefix(root)?.strip_prefix('/')
}
