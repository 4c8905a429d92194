//! Assistant backend seam and its OpenAI implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::ChatError;
use crate::models::Animal;
use crate::openai::{OpenAiClient, OpenAiError};

const RUN_POLL_INTERVAL: Duration = Duration::from_millis(800);
const RUN_POLL_MAX_SECS: u64 = 90;

/// An assistant plus a conversation thread, both bound to one animal's
/// knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub assistant_id: String,
    pub thread_id: String,
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn create_binding(&self, animal: &Animal, index_id: &str) -> Result<Binding, ChatError>;
    async fn ask(&self, binding: &Binding, question: &str) -> Result<String, ChatError>;
    async fn destroy_binding(&self, binding: &Binding) -> Result<(), ChatError>;
}

impl From<OpenAiError> for ChatError {
    fn from(err: OpenAiError) -> Self {
        ChatError::Backend(err.to_string())
    }
}

fn assistant_instructions(animal: &Animal) -> String {
    format!(
        r#"You are a helpful veterinary health assistant for {name}, a {species} ({breed}).

Your role is to:
- Answer questions about {name}'s health metrics and medical history
- Provide insights based on the available medical data
- Identify trends or concerning patterns in health metrics
- Explain medical terms in simple language
- Compare current values with reference ranges

Always:
- Be accurate and base responses on the available data
- Clearly state when you don't have enough information
- Use metric values with proper units
- Mention the date when referencing specific measurements
- Be supportive and informative
- Answer in the language the question was asked in

IMPORTANT: You are NOT a replacement for veterinary care. For serious health concerns, always recommend consulting with a veterinarian."#,
        name = animal.name,
        species = animal.species.as_str(),
        breed = animal.breed,
    )
}

#[async_trait]
impl AssistantBackend for OpenAiClient {
    async fn create_binding(&self, animal: &Animal, index_id: &str) -> Result<Binding, ChatError> {
        let assistant_id = self
            .create_assistant(
                &format!("{} Health Assistant", animal.name),
                &assistant_instructions(animal),
                index_id,
            )
            .await?;
        let thread_id = self.create_thread().await?;
        debug!(%assistant_id, %thread_id, animal_id = %animal.id, "bound assistant");
        Ok(Binding {
            assistant_id,
            thread_id,
        })
    }

    async fn ask(&self, binding: &Binding, question: &str) -> Result<String, ChatError> {
        self.add_user_message(&binding.thread_id, question).await?;
        let run = self
            .create_run(&binding.thread_id, &binding.assistant_id)
            .await?;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(RUN_POLL_MAX_SECS);
        let mut status = run.status;
        while matches!(status.as_str(), "queued" | "in_progress" | "cancelling") {
            if tokio::time::Instant::now() >= deadline {
                return Err(ChatError::RunTimeout(RUN_POLL_MAX_SECS));
            }
            tokio::time::sleep(RUN_POLL_INTERVAL).await;
            status = self.get_run(&binding.thread_id, &run.id).await?.status;
        }
        if status != "completed" {
            return Err(ChatError::RunFailed(status));
        }

        self.latest_assistant_text(&binding.thread_id)
            .await?
            .ok_or_else(|| ChatError::Backend("run completed without a text reply".into()))
    }

    async fn destroy_binding(&self, binding: &Binding) -> Result<(), ChatError> {
        self.delete_assistant(&binding.assistant_id).await?;
        self.delete_thread(&binding.thread_id).await?;
        Ok(())
    }
}
