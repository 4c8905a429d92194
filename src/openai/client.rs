use std::time::Duration;

use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::types::*;
use super::OpenAiError;

const REQUEST_TIMEOUT_SECS: u64 = 120;
const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

/// Thin async wrapper over the engine's REST API. One instance is shared
/// across the application; reqwest pools connections internally.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, OpenAiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| OpenAiError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // ──────────────────────────────────────────────
    // Chat completions
    // ──────────────────────────────────────────────

    /// Single-turn text completion.
    pub async fn complete_text(&self, prompt: &str) -> Result<String, OpenAiError> {
        self.chat_completion(vec![RequestMessage {
            role: "user",
            content: MessageContent::Text(prompt.to_string()),
        }])
        .await
    }

    /// Single-turn multimodal completion: a text instruction plus one
    /// image passed as a base64 data URL.
    pub async fn complete_vision(
        &self,
        prompt: &str,
        image_data_url: &str,
    ) -> Result<String, OpenAiError> {
        self.chat_completion(vec![RequestMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_data_url.to_string(),
                    },
                },
            ]),
        }])
        .await
    }

    async fn chat_completion(&self, messages: Vec<RequestMessage>) -> Result<String, OpenAiError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_completion_tokens: 2048,
            temperature: 0.7,
        };
        let response: ChatCompletionResponse =
            self.post_json("/chat/completions", &request, false).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAiError::InvalidResponse("completion had no choices".into()))
    }

    // ──────────────────────────────────────────────
    // Files + vector stores
    // ──────────────────────────────────────────────

    /// Upload a text document for retrieval; returns the file id.
    pub async fn upload_document(
        &self,
        file_name: &str,
        content: String,
    ) -> Result<String, OpenAiError> {
        let part = multipart::Part::text(content)
            .file_name(file_name.to_string())
            .mime_str("text/plain")
            .map_err(|e| OpenAiError::Http(e.to_string()))?;
        let form = multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let response = self
            .http
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OpenAiError::from_reqwest(e, &self.base_url, REQUEST_TIMEOUT_SECS))?;
        let file: FileObject = Self::read_json(response).await?;
        debug!(file_id = %file.id, "uploaded document");
        Ok(file.id)
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), OpenAiError> {
        self.delete(&format!("/files/{file_id}"), false).await
    }

    pub async fn create_vector_store(
        &self,
        name: &str,
        animal_id: &str,
    ) -> Result<String, OpenAiError> {
        let request = CreateVectorStoreRequest {
            name: name.to_string(),
            metadata: json!({ "animalId": animal_id }),
        };
        let store: VectorStoreObject = self.post_json("/vector_stores", &request, true).await?;
        Ok(store.id)
    }

    pub async fn attach_file_to_vector_store(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<(), OpenAiError> {
        let request = AttachFileRequest {
            file_id: file_id.to_string(),
        };
        let _: serde_json::Value = self
            .post_json(&format!("/vector_stores/{vector_store_id}/files"), &request, true)
            .await?;
        Ok(())
    }

    pub async fn detach_file_from_vector_store(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<(), OpenAiError> {
        self.delete(&format!("/vector_stores/{vector_store_id}/files/{file_id}"), true)
            .await
    }

    pub async fn delete_vector_store(&self, vector_store_id: &str) -> Result<(), OpenAiError> {
        self.delete(&format!("/vector_stores/{vector_store_id}"), true)
            .await
    }

    // ──────────────────────────────────────────────
    // Assistants / threads / runs
    // ──────────────────────────────────────────────

    pub async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        vector_store_id: &str,
    ) -> Result<String, OpenAiError> {
        let request = CreateAssistantRequest {
            name: name.to_string(),
            instructions: instructions.to_string(),
            model: self.model.clone(),
            tools: vec![Tool {
                kind: "file_search",
            }],
            tool_resources: ToolResources {
                file_search: FileSearchResources {
                    vector_store_ids: vec![vector_store_id.to_string()],
                },
            },
        };
        let assistant: AssistantObject = self.post_json("/assistants", &request, true).await?;
        Ok(assistant.id)
    }

    pub async fn delete_assistant(&self, assistant_id: &str) -> Result<(), OpenAiError> {
        self.delete(&format!("/assistants/{assistant_id}"), true).await
    }

    pub async fn create_thread(&self) -> Result<String, OpenAiError> {
        let thread: ThreadObject = self.post_json("/threads", &json!({}), true).await?;
        Ok(thread.id)
    }

    pub async fn delete_thread(&self, thread_id: &str) -> Result<(), OpenAiError> {
        self.delete(&format!("/threads/{thread_id}"), true).await
    }

    pub async fn add_user_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<(), OpenAiError> {
        let request = CreateThreadMessageRequest {
            role: "user",
            content: content.to_string(),
        };
        let _: serde_json::Value = self
            .post_json(&format!("/threads/{thread_id}/messages"), &request, true)
            .await?;
        Ok(())
    }

    pub async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunObject, OpenAiError> {
        let request = CreateRunRequest {
            assistant_id: assistant_id.to_string(),
        };
        self.post_json(&format!("/threads/{thread_id}/runs"), &request, true)
            .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, OpenAiError> {
        self.get_json(&format!("/threads/{thread_id}/runs/{run_id}"), true)
            .await
    }

    /// Most recent assistant reply in the thread, if any.
    pub async fn latest_assistant_text(
        &self,
        thread_id: &str,
    ) -> Result<Option<String>, OpenAiError> {
        let list: MessageList = self
            .get_json(&format!("/threads/{thread_id}/messages?order=desc&limit=10"), true)
            .await?;
        for message in list.data {
            if message.role != "assistant" {
                continue;
            }
            for block in message.content {
                if block.kind == "text" {
                    if let Some(text) = block.text {
                        return Ok(Some(text.value));
                    }
                }
            }
        }
        Ok(None)
    }

    // ──────────────────────────────────────────────
    // Plumbing
    // ──────────────────────────────────────────────

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        beta: bool,
    ) -> Result<T, OpenAiError> {
        let mut request = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body);
        if beta {
            request = request.header("OpenAI-Beta", ASSISTANTS_BETA_HEADER);
        }
        let response = request
            .send()
            .await
            .map_err(|e| OpenAiError::from_reqwest(e, &self.base_url, REQUEST_TIMEOUT_SECS))?;
        Self::read_json(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        beta: bool,
    ) -> Result<T, OpenAiError> {
        let mut request = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key);
        if beta {
            request = request.header("OpenAI-Beta", ASSISTANTS_BETA_HEADER);
        }
        let response = request
            .send()
            .await
            .map_err(|e| OpenAiError::from_reqwest(e, &self.base_url, REQUEST_TIMEOUT_SECS))?;
        Self::read_json(response).await
    }

    async fn delete(&self, path: &str, beta: bool) -> Result<(), OpenAiError> {
        let mut request = self
            .http
            .delete(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key);
        if beta {
            request = request.header("OpenAI-Beta", ASSISTANTS_BETA_HEADER);
        }
        let response = request
            .send()
            .await
            .map_err(|e| OpenAiError::from_reqwest(e, &self.base_url, REQUEST_TIMEOUT_SECS))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, OpenAiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| OpenAiError::Http(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| OpenAiError::InvalidResponse(e.to_string()))
    }
}
