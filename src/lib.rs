//! citewise: search-augmented, citation-grounded answers.
//!
//! Given a conversation, citewise searches the web for the latest message,
//! fetches and extracts the readable text of every result under a per-page
//! deadline, builds a prompt that cites each page as `[n](link)`, streams the
//! completion from a chat backend and reduces the stream to one answer.
//!
//! # Architecture
//!
//! - **Search and fetch**: the `citewise-search` crate (provider dispatch,
//!   concurrent fetch-with-timeout, readability extraction, sanitizing)
//! - **Prompt**: [`prompt::PromptBuilder`], deterministic given its inputs
//! - **Completion**: [`completion::HttpCompletionClient`] returns the raw body stream
//! - **Accumulation**: [`sse`] splits frames, [`accumulator`] folds deltas
//! - **Glue**: [`pipeline::AnswerPipeline`], served over HTTP by [`server`]

pub mod accumulator;
pub mod completion;
pub mod config;
pub mod error;
pub mod history;
pub mod message;
pub mod pipeline;
pub mod prompt;
pub mod server;
pub mod sse;

pub use config::CitewiseConfig;
pub use error::{CitewiseError, Result};
pub use pipeline::{Answer, AnswerPipeline, AnswerRequest};
pub use server::CitewiseServer;
