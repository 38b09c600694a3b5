//! Minimal GitHub REST client covering the source-control calls the bot
//! needs: pull-request metadata, ref comparison, file contents, branch refs,
//! trees and pull-request creation.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

pub mod models;

use models::{
    ChangedFile, CompareResponse, PullCommit, PullRequest, RefLookup, RepoContent, Repository,
    TreeResponse,
};

const GITHUB_API_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("msgshot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    /// The queried object does not exist. Callers that probe for existence
    /// match on this; every other failure must be surfaced instead.
    #[error("not found")]
    NotFound,
    #[error("GitHub responded {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// A file fetched through the contents API.
#[derive(Debug, Clone)]
pub struct RepoFile {
    pub sha: String,
    pub bytes: Vec<u8>,
}

impl RepoFile {
    pub fn text(&self) -> Result<String, ApiError> {
        String::from_utf8(self.bytes.clone()).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// HTTP client for one repository, authenticated with a token.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::with_base_url(GITHUB_API_BASE_URL, token, owner, repo)
    }

    /// Point the client at a different API root (GitHub Enterprise, or a mock
    /// server in tests).
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn repo_url(&self, tail: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base_url, self.owner, self.repo, tail)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/vnd.github+json")
    }

    async fn get_json<T>(&self, url: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.request(self.client.get(url)).send().await?;
        let response = Self::checked(response, url)?;
        Ok(response.json::<T>().await?)
    }

    fn checked(response: Response, url: &str) -> Result<Response, ApiError> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            status if !status.is_success() => Err(ApiError::Status {
                status,
                url: url.to_string(),
            }),
            _ => Ok(response),
        }
    }

    pub async fn pull_request(&self, number: u64) -> Result<PullRequest, ApiError> {
        self.get_json(&self.repo_url(&format!("pulls/{number}"))).await
    }

    /// Commits of a pull request, oldest first.
    pub async fn pull_request_commits(&self, number: u64) -> Result<Vec<PullCommit>, ApiError> {
        self.get_json(&self.repo_url(&format!("pulls/{number}/commits")))
            .await
    }

    /// Changed files between two refs, with per-file status.
    pub async fn changed_files(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<ChangedFile>, ApiError> {
        let response: CompareResponse = self
            .get_json(&self.repo_url(&format!("compare/{base}...{head}")))
            .await?;
        Ok(response.files)
    }

    /// Fetch one file at a ref. Returns [`ApiError::NotFound`] when no blob
    /// exists at that path, which callers use as an existence probe.
    pub async fn file_content(&self, path: &str, git_ref: &str) -> Result<RepoFile, ApiError> {
        let url = self.repo_url(&format!("contents/{path}?ref={git_ref}"));
        let content: RepoContent = self.get_json(&url).await?;

        let encoded = content.content.unwrap_or_default();
        if let Some(encoding) = &content.encoding
            && encoding != "base64"
        {
            return Err(ApiError::Decode(format!("unexpected encoding {encoding}")));
        }
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(compact)
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(RepoFile {
            sha: content.sha,
            bytes,
        })
    }

    /// Create or update a file on a branch. Pass the current blob sha to
    /// replace an existing file; omit it to create a new one.
    pub async fn put_file(
        &self,
        path: &str,
        bytes: &[u8],
        message: &str,
        branch: &str,
        sha: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.repo_url(&format!("contents/{path}"));
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(bytes),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let response = self
            .request(self.client.put(&url))
            .json(&body)
            .send()
            .await?;
        Self::checked(response, &url)?;
        Ok(())
    }

    pub async fn repository(&self) -> Result<Repository, ApiError> {
        let url = format!("{}/repos/{}/{}", self.base_url, self.owner, self.repo);
        self.get_json(&url).await
    }

    pub async fn branch_sha(&self, branch: &str) -> Result<String, ApiError> {
        let lookup: RefLookup = self
            .get_json(&self.repo_url(&format!("git/ref/heads/{branch}")))
            .await?;
        Ok(lookup.object.sha)
    }

    pub async fn create_branch(&self, branch: &str, sha: &str) -> Result<(), ApiError> {
        let url = self.repo_url("git/refs");
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });
        let response = self
            .request(self.client.post(&url))
            .json(&body)
            .send()
            .await?;
        Self::checked(response, &url)?;
        Ok(())
    }

    pub async fn delete_branch(&self, branch: &str) -> Result<(), ApiError> {
        let url = self.repo_url(&format!("git/refs/heads/{branch}"));
        let response = self.request(self.client.delete(&url)).send().await?;
        Self::checked(response, &url)?;
        Ok(())
    }

    /// Every blob path reachable from a tree, recursively.
    pub async fn tree_paths(&self, sha: &str) -> Result<Vec<String>, ApiError> {
        let response: TreeResponse = self
            .get_json(&self.repo_url(&format!("git/trees/{sha}?recursive=1")))
            .await?;
        if response.truncated {
            tracing::warn!("repository tree listing was truncated by GitHub");
        }
        Ok(response
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| entry.path)
            .collect())
    }

    pub async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<PullRequest, ApiError> {
        let url = self.repo_url("pulls");
        let payload = json!({ "title": title, "head": head, "base": base, "body": body });
        let response = self
            .request(self.client.post(&url))
            .json(&payload)
            .send()
            .await?;
        let response = Self::checked(response, &url)?;
        Ok(response.json::<PullRequest>().await?)
    }
}
