//! The nitpick review pipeline: fetch a PR diff, ask a model for structured
//! review comments, refine and deduplicate them, and post them back.
//!
//! Provides the GitHub client, the OpenAI-compatible LLM client, the three
//! instruction prompts, the reply decoder, and the orchestrator that wires
//! the stages together.

pub mod decode;
pub mod github;
pub mod llm;
pub mod pipeline;
pub mod prompt;
