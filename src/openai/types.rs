//! Request/response bodies for the engine API surfaces we use.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ──────────────────────────────────────────────
// Chat completions
// ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<RequestMessage>,
    pub max_completion_tokens: u32,
    pub temperature: f32,
}

#[derive(Serialize)]
pub struct RequestMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

// ──────────────────────────────────────────────
// Files + vector stores
// ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FileObject {
    pub id: String,
}

#[derive(Serialize)]
pub struct CreateVectorStoreRequest {
    pub name: String,
    pub metadata: Value,
}

#[derive(Deserialize)]
pub struct VectorStoreObject {
    pub id: String,
}

#[derive(Serialize)]
pub struct AttachFileRequest {
    pub file_id: String,
}

// ──────────────────────────────────────────────
// Assistants / threads / runs (beta v2)
// ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct CreateAssistantRequest {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<Tool>,
    pub tool_resources: ToolResources,
}

#[derive(Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Serialize)]
pub struct ToolResources {
    pub file_search: FileSearchResources,
}

#[derive(Serialize)]
pub struct FileSearchResources {
    pub vector_store_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct AssistantObject {
    pub id: String,
}

#[derive(Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

#[derive(Serialize)]
pub struct CreateThreadMessageRequest {
    pub role: &'static str,
    pub content: String,
}

#[derive(Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
}

#[derive(Deserialize)]
pub struct RunObject {
    pub id: String,
    pub status: String,
}

#[derive(Deserialize)]
pub struct MessageList {
    pub data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    pub content: Vec<ThreadMessageContent>,
}

#[derive(Deserialize)]
pub struct ThreadMessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<ThreadMessageText>,
}

#[derive(Deserialize)]
pub struct ThreadMessageText {
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multimodal_message_serializes_to_parts_array() {
        let msg = RequestMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "describe".into(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".into(),
                    },
                },
            ]),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn text_message_serializes_to_plain_string() {
        let msg = RequestMessage {
            role: "user",
            content: MessageContent::Text("hello".into()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn run_status_deserializes() {
        let run: RunObject =
            serde_json::from_str(r#"{"id":"run_1","status":"completed"}"#).unwrap();
        assert_eq!(run.status, "completed");
    }

    #[test]
    fn thread_message_text_block_deserializes() {
        let list: MessageList = serde_json::from_str(
            r#"{"data":[{"role":"assistant","content":[{"type":"text","text":{"value":"відповідь"}}]}]}"#,
        )
        .unwrap();
        assert_eq!(list.data[0].content[0].text.as_ref().unwrap().value, "відповідь");
    }
}
