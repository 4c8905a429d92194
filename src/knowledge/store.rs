//! Vector index seam and its OpenAI-backed implementation.

use async_trait::async_trait;
use tracing::debug;

use super::SyncError;
use crate::openai::{OpenAiClient, OpenAiError};

/// External document index, one per animal. The id returned by
/// `create_index` and the document ids returned by `upload_document`
/// are opaque backend handles persisted in the local database.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn create_index(&self, name: &str, animal_id: &str) -> Result<String, SyncError>;
    async fn upload_document(
        &self,
        index_id: &str,
        file_name: &str,
        content: String,
    ) -> Result<String, SyncError>;
    async fn delete_document(&self, index_id: &str, document_id: &str) -> Result<(), SyncError>;
    async fn delete_index(&self, index_id: &str) -> Result<(), SyncError>;
}

impl From<OpenAiError> for SyncError {
    fn from(err: OpenAiError) -> Self {
        SyncError::Backend(err.to_string())
    }
}

#[async_trait]
impl VectorIndex for OpenAiClient {
    async fn create_index(&self, name: &str, animal_id: &str) -> Result<String, SyncError> {
        let id = self.create_vector_store(name, animal_id).await?;
        debug!(index_id = %id, %animal_id, "created vector index");
        Ok(id)
    }

    /// A document is a file plus its attachment to the store; the file
    /// id doubles as the document handle.
    async fn upload_document(
        &self,
        index_id: &str,
        file_name: &str,
        content: String,
    ) -> Result<String, SyncError> {
        let file_id = OpenAiClient::upload_document(self, file_name, content).await?;
        if let Err(err) = self.attach_file_to_vector_store(index_id, &file_id).await {
            // Don't leak the orphaned file; the attach failure wins.
            let _ = self.delete_file(&file_id).await;
            return Err(err.into());
        }
        Ok(file_id)
    }

    async fn delete_document(&self, index_id: &str, document_id: &str) -> Result<(), SyncError> {
        self.detach_file_from_vector_store(index_id, document_id)
            .await?;
        self.delete_file(document_id).await?;
        Ok(())
    }

    async fn delete_index(&self, index_id: &str) -> Result<(), SyncError> {
        self.delete_vector_store(index_id).await?;
        Ok(())
    }
}
