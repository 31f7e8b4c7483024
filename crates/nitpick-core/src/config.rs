use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NitpickError;

/// Top-level configuration loaded from `.nitpick.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use nitpick_core::NitpickConfig;
///
/// let config = NitpickConfig::default();
/// assert!(config.pipeline.refine);
/// assert_eq!(config.llm.max_retries, 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NitpickConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// GitHub access settings.
    #[serde(default)]
    pub github: GithubConfig,
    /// Pipeline behavior settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl NitpickConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NitpickError::Io`] if the file cannot be read, or
    /// [`NitpickError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nitpick_core::NitpickConfig;
    /// use std::path::Path;
    ///
    /// let config = NitpickConfig::from_file(Path::new(".nitpick.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, NitpickError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`NitpickError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use nitpick_core::NitpickConfig;
    ///
    /// let toml = r#"
    /// [pipeline]
    /// dedupe = false
    /// "#;
    /// let config = NitpickConfig::from_toml(toml).unwrap();
    /// assert!(!config.pipeline.dedupe);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, NitpickError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use nitpick_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o-mini");
/// assert_eq!(config.temperature, 0.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (e.g. `"openai"`, `"ollama"`).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key; falls back to the `OPENAI_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Sampling temperature. Reviews want deterministic output, so 0.0.
    #[serde(default)]
    pub temperature: f64,
    /// Retry count for transient model-call failures (default: 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: 0.0,
            max_retries: default_max_retries(),
        }
    }
}

/// GitHub access configuration.
///
/// # Examples
///
/// ```
/// use nitpick_core::GithubConfig;
///
/// let config = GithubConfig::default();
/// assert!(config.token.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Personal access token; falls back to the `GITHUB_TOKEN` environment
    /// variable.
    pub token: Option<String>,
}

/// Pipeline behavior configuration.
///
/// # Examples
///
/// ```
/// use nitpick_core::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert!(config.refine);
/// assert!(config.dedupe);
/// assert!(config.continue_on_publish_error);
/// assert!(!config.restrict_to_diff);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run the review-and-refine pass over raw comments (default: true).
    #[serde(default = "default_true")]
    pub refine: bool,
    /// Deduplicate against comments already posted on the PR (default: true).
    #[serde(default = "default_true")]
    pub dedupe: bool,
    /// Keep posting remaining comments after one post fails (default: true).
    /// When false, the first failed post aborts the batch.
    #[serde(default = "default_true")]
    pub continue_on_publish_error: bool,
    /// Drop comments that name files absent from the fetched diff
    /// (default: false — the model's judgment is trusted).
    #[serde(default)]
    pub restrict_to_diff: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            refine: true,
            dedupe: true,
            continue_on_publish_error: true,
            restrict_to_diff: false,
        }
    }
}
