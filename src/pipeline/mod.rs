//! Lab-document extraction pipeline.
//!
//! A document arrives as base64 payload + declared media type, gets
//! normalized (images stay binary, PDFs lose their container and become
//! plain text), goes through the completion engine with a
//! language-aware prompt, and the reply is parsed into structured
//! metrics. Business validation of the parsed values is the API
//! layer's job, not the parser's.

pub mod extract;
pub mod normalize;
pub mod parser;
pub mod prompt;

pub use extract::{CompletionEngine, ExtractionService};
pub use normalize::{MediaType, NormalizedDocument};
pub use parser::{coerce_numeric, ExtractedMetric, ExtractionResult};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(String),

    #[error("Document has no extractable content")]
    EmptyDocument,

    #[error("Extraction engine unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Engine reply is not valid extraction JSON")]
    MalformedExtraction { raw: String },
}
