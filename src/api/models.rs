//! Wire models for the slice of the GitHub REST API this tool consumes.

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub head: GitRef,
    pub base: GitRef,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PullCommit {
    pub sha: String,
    /// The GitHub account the commit is attributed to; absent when the commit
    /// email does not map to an account.
    pub author: Option<Actor>,
}

#[derive(Debug, Deserialize)]
pub struct CompareResponse {
    #[serde(default)]
    pub files: Vec<ChangedFile>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChangedFile {
    pub filename: String,
    pub status: String,
}

/// Contents-API response for a single file lookup.
#[derive(Debug, Deserialize)]
pub struct RepoContent {
    pub sha: String,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub struct RefLookup {
    pub object: RefObject,
}

#[derive(Debug, Deserialize)]
pub struct RefObject {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct TreeResponse {
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}
