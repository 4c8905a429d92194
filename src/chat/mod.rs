//! Grounded chat over an animal's knowledge base.

pub mod backend;
pub mod service;

pub use backend::{AssistantBackend, Binding};
pub use service::{Answer, ChatService};

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat backend not configured")]
    NotConfigured,

    #[error("Assistant run ended with status {0}")]
    RunFailed(String),

    #[error("Assistant run still pending after {0}s")]
    RunTimeout(u64),

    #[error("Chat backend failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("animal {0} not found")]
    AnimalNotFound(String),
}
