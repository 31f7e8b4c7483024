//! Core types, configuration, and error handling for the nitpick pipeline.
//!
//! This crate provides the shared foundation used by the other nitpick crates:
//! - [`NitpickError`] — unified error type using `thiserror`
//! - [`NitpickConfig`] — configuration loaded from `.nitpick.toml`
//! - Shared types: [`Comment`], [`Category`], [`PullRequest`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{GithubConfig, LlmConfig, NitpickConfig, PipelineConfig};
pub use error::NitpickError;
pub use types::{Category, Comment, OutputFormat, PullRequest};

/// A convenience `Result` type for nitpick operations.
pub type Result<T> = std::result::Result<T, NitpickError>;
