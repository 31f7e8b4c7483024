use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Issue category attached to a review comment.
///
/// The conventional values are `Logic`, `Good Code Practice`, and `Security`,
/// but the set is open: the model may emit other labels and they round-trip
/// through [`Category::Other`] rather than being rejected.
///
/// # Examples
///
/// ```
/// use nitpick_core::Category;
///
/// let c: Category = serde_json::from_str("\"Security\"").unwrap();
/// assert_eq!(c, Category::Security);
///
/// let c: Category = serde_json::from_str("\"Performance\"").unwrap();
/// assert_eq!(c, Category::Other("Performance".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Logical errors or inefficiencies.
    Logic,
    /// Naming, organization, readability improvements.
    GoodCodePractice,
    /// Potential security vulnerabilities.
    Security,
    /// Any other label the model chose to emit.
    Other(String),
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "logic" => Category::Logic,
            "good code practice" | "good code practices" => Category::GoodCodePractice,
            "security" => Category::Security,
            _ => Category::Other(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Logic => write!(f, "Logic"),
            Category::GoodCodePractice => write!(f, "Good Code Practice"),
            Category::Security => write!(f, "Security"),
            Category::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A single review comment flowing through the pipeline.
///
/// This is the shared contract between every stage: the analysis, refinement,
/// and deduplication stages all produce and consume sequences of this record,
/// and the publisher renders each one as an issue comment.
///
/// # Examples
///
/// ```
/// use nitpick_core::{Category, Comment};
///
/// let comment = Comment {
///     file: "src/auth.py".into(),
///     line: Some(42),
///     suggestion: "Validate the token before use".into(),
///     category: Category::Security,
/// };
/// assert!(comment.is_publishable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Changed file the comment applies to.
    pub file: String,
    /// Line number within the file; absent when the model omitted or
    /// hallucinated it.
    pub line: Option<u32>,
    /// Free-form description of the issue and remediation.
    pub suggestion: String,
    /// Issue category, serialized under the wire key `type`.
    #[serde(rename = "type")]
    pub category: Category,
}

impl Comment {
    /// Whether this comment satisfies the publishing invariant: `file` and
    /// `suggestion` are non-empty. A missing `line` does not block publishing.
    pub fn is_publishable(&self) -> bool {
        !self.file.trim().is_empty() && !self.suggestion.trim().is_empty()
    }
}

/// Target pull request, parsed from an `owner/repo#number` reference.
///
/// # Examples
///
/// ```
/// use nitpick_core::PullRequest;
///
/// let pr: PullRequest = "octocat/hello-world#42".parse().unwrap();
/// assert_eq!(pr.owner, "octocat");
/// assert_eq!(pr.repo, "hello-world");
/// assert_eq!(pr.number, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
}

impl fmt::Display for PullRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

impl FromStr for PullRequest {
    type Err = crate::NitpickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((owner_repo, number_str)) = s.split_once('#') else {
            return Err(crate::NitpickError::Config(format!(
                "invalid PR reference '{s}', expected owner/repo#number"
            )));
        };
        let Some((owner, repo)) = owner_repo.split_once('/') else {
            return Err(crate::NitpickError::Config(format!(
                "invalid PR reference '{s}', expected owner/repo#number"
            )));
        };
        if owner.is_empty() || repo.is_empty() {
            return Err(crate::NitpickError::Config(format!(
                "invalid PR reference '{s}', owner and repo must be non-empty"
            )));
        }
        let number: u64 = number_str.parse().map_err(|_| {
            crate::NitpickError::Config(format!("invalid PR number: {number_str}"))
        })?;
        Ok(PullRequest {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }
}

/// Output format for CLI results.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use nitpick_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary (default).
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
