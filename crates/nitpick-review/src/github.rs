use async_trait::async_trait;
use nitpick_core::{NitpickError, PullRequest};
use serde::Deserialize;

/// One changed file in a pull request, as returned by the GitHub
/// `pulls/{n}/files` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    /// Path of the file within the repository.
    pub filename: String,
    /// Unified-diff patch for the file. Absent for binary files.
    pub patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    body: Option<String>,
}

/// The seam the pipeline uses to talk to the pull-request hosting service.
///
/// Implemented by [`GitHubClient`] in production and by test doubles in the
/// pipeline tests.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Fetch the concatenated per-file diff text for a pull request.
    async fn fetch_pr_diff(&self, pr: &PullRequest) -> Result<String, NitpickError>;

    /// Fetch the concatenated bodies of comments already posted on the PR
    /// thread.
    async fn fetch_existing_comments(&self, pr: &PullRequest) -> Result<String, NitpickError>;

    /// Post one comment with the given body on the PR thread.
    async fn post_comment(&self, pr: &PullRequest, body: &str) -> Result<(), NitpickError>;
}

/// GitHub client for fetching PR diffs and posting issue comments.
///
/// Reads go through a plain `reqwest` client against the REST API; writes go
/// through `octocrab`.
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
}

impl GitHubClient {
    /// Create a client from an explicit token or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`NitpickError::Config`] if no token is available, or
    /// [`NitpickError::Fetch`] if the client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nitpick_review::github::GitHubClient;
    ///
    /// let client = GitHubClient::new(Some("ghp_xxxx")).unwrap();
    /// ```
    pub fn new(token: Option<&str>) -> Result<Self, NitpickError> {
        let token = match token {
            Some(t) => t.to_string(),
            None => std::env::var("GITHUB_TOKEN").map_err(|_| {
                NitpickError::Config(
                    "GITHUB_TOKEN not set. Set [github].token or the GITHUB_TOKEN env var".into(),
                )
            })?,
        };

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.clone())
            .build()
            .map_err(|e| NitpickError::Fetch(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::new();

        Ok(Self {
            octocrab,
            http,
            token,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, NitpickError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "nitpick")
            .send()
            .await
            .map_err(|e| NitpickError::Fetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NitpickError::Fetch(format!(
                "GitHub API error {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| NitpickError::Fetch(format!("failed to read response from {url}: {e}")))
    }
}

#[async_trait]
impl PullRequestHost for GitHubClient {
    /// Fetch the list of changed files and concatenate their patches.
    ///
    /// An empty-but-successful file list is valid and yields empty diff text;
    /// any transport, auth, or not-found error propagates as
    /// [`NitpickError::Fetch`] so the run aborts instead of reviewing a
    /// partial diff.
    async fn fetch_pr_diff(&self, pr: &PullRequest) -> Result<String, NitpickError> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/pulls/{}/files?per_page=100",
            pr.owner, pr.repo, pr.number
        );
        let files: Vec<ChangedFile> = self.get_json(&url).await?;
        Ok(files_to_diff_text(&files))
    }

    /// Fetch all comments on the PR's issue thread as one newline-joined blob.
    ///
    /// Failures here propagate as [`NitpickError::Fetch`]; the caller decides
    /// whether to degrade (the pipeline treats this fetch as non-fatal).
    async fn fetch_existing_comments(&self, pr: &PullRequest) -> Result<String, NitpickError> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/issues/{}/comments?per_page=100",
            pr.owner, pr.repo, pr.number
        );
        let comments: Vec<IssueComment> = self.get_json(&url).await?;
        Ok(comments
            .into_iter()
            .filter_map(|c| c.body)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Post one issue comment on the PR thread.
    ///
    /// # Errors
    ///
    /// Returns [`NitpickError::Publish`] on API errors.
    async fn post_comment(&self, pr: &PullRequest, body: &str) -> Result<(), NitpickError> {
        let route = format!(
            "/repos/{}/{}/issues/{}/comments",
            pr.owner, pr.repo, pr.number
        );
        let payload = serde_json::json!({ "body": body });

        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(&payload))
            .await
            .map_err(|e| NitpickError::Publish(format!("failed to post comment: {e}")))?;

        Ok(())
    }
}

/// Concatenate changed files into the diff text the analysis stage consumes.
///
/// Each file contributes a `File:` header followed by its patch, in the order
/// the API returned them, separated by blank lines. Binary files (no patch)
/// get a placeholder so the model still sees that the file changed.
///
/// # Examples
///
/// ```
/// use nitpick_review::github::{files_to_diff_text, ChangedFile};
///
/// let files = vec![ChangedFile {
///     filename: "a.py".into(),
///     patch: Some("@@ -1 +1 @@\n-x\n+y".into()),
/// }];
/// let text = files_to_diff_text(&files);
/// assert!(text.starts_with("File: a.py\n"));
/// ```
pub fn files_to_diff_text(files: &[ChangedFile]) -> String {
    files
        .iter()
        .map(|f| {
            let patch = f.patch.as_deref().unwrap_or("(binary or omitted patch)");
            format!("File: {}\n{}\n", f.filename, patch)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
