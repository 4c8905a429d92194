//! Per-animal knowledge base synchronization.
//!
//! Each animal owns at most one external vector index. Lab tests and
//! standalone metrics are rendered to plain-text documents and mirrored
//! into that index; the local database keeps the document handles and
//! an optimistic sync version so concurrent regenerations cannot leave
//! a dangling or duplicated document behind.

pub mod render;
pub mod store;
pub mod sync;

pub use store::VectorIndex;
pub use sync::KnowledgeSync;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Knowledge base backend not configured")]
    NotConfigured,

    #[error("Knowledge base backend failed: {0}")]
    Backend(String),

    #[error("Concurrent regeneration won; this upload is stale")]
    Conflict,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}
