//! Document → structured metrics, via the completion engine.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::normalize::NormalizedDocument;
use super::parser::{parse_extraction, ExtractionResult};
use super::prompt::{extraction_prompt, extraction_prompt_with_text};
use super::ExtractionError;
use crate::openai::OpenAiClient;

/// Seam over the completion engine so the pipeline is testable without
/// a live backend.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    async fn complete_text(&self, prompt: &str) -> Result<String, ExtractionError>;
    async fn complete_vision(
        &self,
        prompt: &str,
        image_data_url: &str,
    ) -> Result<String, ExtractionError>;
}

#[async_trait]
impl CompletionEngine for OpenAiClient {
    async fn complete_text(&self, prompt: &str) -> Result<String, ExtractionError> {
        OpenAiClient::complete_text(self, prompt)
            .await
            .map_err(|e| ExtractionError::ServiceUnavailable(e.to_string()))
    }

    async fn complete_vision(
        &self,
        prompt: &str,
        image_data_url: &str,
    ) -> Result<String, ExtractionError> {
        OpenAiClient::complete_vision(self, prompt, image_data_url)
            .await
            .map_err(|e| ExtractionError::ServiceUnavailable(e.to_string()))
    }
}

pub struct ExtractionService {
    engine: Arc<dyn CompletionEngine>,
}

impl ExtractionService {
    pub fn new(engine: Arc<dyn CompletionEngine>) -> Self {
        Self { engine }
    }

    /// Runs the full pipeline on a normalized document. Images go
    /// through the multimodal path; PDFs are reduced to their text
    /// layer first (scanned PDFs without one are rejected).
    pub async fn extract(
        &self,
        document: &NormalizedDocument,
        language_code: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        let raw = if document.media_type.is_image() {
            debug!(media = document.media_type.mime(), "extracting from image");
            self.engine
                .complete_vision(&extraction_prompt(language_code), &document.as_data_url())
                .await?
        } else {
            let text = pdf_extract::extract_text_from_mem(&document.bytes)
                .map_err(|e| ExtractionError::InvalidPayload(e.to_string()))?;
            if text.trim().is_empty() {
                return Err(ExtractionError::EmptyDocument);
            }
            debug!(chars = text.len(), "extracting from PDF text layer");
            self.engine
                .complete_text(&extraction_prompt_with_text(language_code, &text))
                .await?
        };

        if raw.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        let result = parse_extraction(&raw)?;
        info!(metrics = result.metrics.len(), "extraction complete");
        Ok(result)
    }
}
