/// Errors that can occur across the nitpick pipeline.
///
/// Each variant wraps a specific failure domain. Library crates use this type
/// directly; the binary crate converts to miette diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use nitpick_core::NitpickError;
///
/// let err = NitpickError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum NitpickError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Diff or comment retrieval from the hosting API failed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// LLM API transport or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The model reply was not valid JSON after fence stripping.
    ///
    /// Carries the raw reply so a bad prompt or model regression can be
    /// diagnosed instead of vanishing into an empty result.
    #[error("decode error: {message}")]
    Decode {
        /// What went wrong during parsing.
        message: String,
        /// The raw model reply that failed to decode.
        raw: String,
    },

    /// A decoded value was not an array where one is required.
    #[error("shape error: expected a JSON array, got {0}")]
    Shape(String),

    /// Posting a comment to the pull request failed.
    #[error("publish error: {0}")]
    Publish(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
