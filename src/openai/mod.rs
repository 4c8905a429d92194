//! HTTP client for the external OpenAI-compatible engine.
//!
//! Three API surfaces are used:
//! - chat completions (text + multimodal) for document extraction;
//! - files + vector stores for the per-animal knowledge base;
//! - assistants/threads/runs (beta v2) for grounded chat.

pub mod client;
pub mod types;

pub use client::OpenAiClient;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenAiError {
    #[error("Engine not reachable at {0}")]
    NotReachable(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Engine returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl OpenAiError {
    pub(crate) fn from_reqwest(err: reqwest::Error, base_url: &str, timeout_secs: u64) -> Self {
        if err.is_connect() {
            OpenAiError::NotReachable(base_url.to_string())
        } else if err.is_timeout() {
            OpenAiError::Timeout(timeout_secs)
        } else {
            OpenAiError::Http(err.to_string())
        }
    }
}
