//! Shared handler state.

use std::sync::Arc;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::api::ApiError;
use crate::chat::ChatService;
use crate::config::Config;
use crate::db::Database;
use crate::knowledge::KnowledgeSync;
use crate::openai::OpenAiClient;
use crate::pipeline::ExtractionService;

/// Header identifying the calling owner on owner-scoped endpoints.
/// Authentication proper is handled by the deployment's edge, not here.
pub const OWNER_ID_HEADER: &str = "X-Owner-Id";

/// Everything handlers need. The AI-backed services are `None` when no
/// API key is configured; the affected endpoints then answer 503 while
/// plain CRUD keeps working.
#[derive(Clone)]
pub struct AppContext {
    pub db: Database,
    pub extraction: Option<Arc<ExtractionService>>,
    pub knowledge: Option<Arc<KnowledgeSync>>,
    pub chat: Option<Arc<ChatService>>,
}

impl AppContext {
    /// Degraded context without AI services.
    pub fn without_engine(db: Database) -> Self {
        Self {
            db,
            extraction: None,
            knowledge: None,
            chat: None,
        }
    }

    /// Full context; one shared client backs all three services.
    pub fn with_engine(db: Database, client: OpenAiClient) -> Self {
        let client = Arc::new(client);
        Self {
            extraction: Some(Arc::new(ExtractionService::new(client.clone()))),
            knowledge: Some(Arc::new(KnowledgeSync::new(db.clone(), client.clone()))),
            chat: Some(Arc::new(ChatService::new(db.clone(), client))),
            db,
        }
    }

    pub fn from_config(db: Database, config: &Config) -> Result<Self, crate::openai::OpenAiError> {
        match &config.openai_api_key {
            Some(key) => {
                let client = OpenAiClient::new(&config.openai_base_url, key, &config.model)?;
                Ok(Self::with_engine(db, client))
            }
            None => {
                tracing::warn!("OPENAI_API_KEY not set; extraction, sync and chat are disabled");
                Ok(Self::without_engine(db))
            }
        }
    }

    pub fn ai_configured(&self) -> bool {
        self.extraction.is_some()
    }
}

/// Parses the calling owner's id out of the request headers.
pub fn owner_id_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let raw = headers
        .get(OWNER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("{OWNER_ID_HEADER} header required")))?;
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("{OWNER_ID_HEADER} is not a valid UUID")))
}
