use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use crate::error::PerceptionError;

const SYSTEM_PROMPT: &str = "As a cute desktop pet avatar, analyze screenshots and respond \
with JSON containing 'comment' and 'action'. Actions: 'idle' for normal content, 'engage' \
for gaming/exciting content. Keep comments under 50 characters, be playful and gaming-focused.";

const USER_PROMPT: &str = "Analyze this screen and respond with JSON: \
{\"comment\": \"your short friendly comment\", \"action\": \"idle or engage\"}. \
Use 'engage' for games, action scenes, or exciting content. \
Use 'idle' for normal desktop/browsing.";

/// Seam between the analysis service and the remote multimodal endpoint.
/// Takes the transport-safe image encoding, returns the raw response text.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn describe(&self, image_base64: &str) -> Result<String, PerceptionError>;
}

/// Chat-completions backend speaking the OpenAI wire format.
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_completion_tokens: u64,
}

impl OpenAiBackend {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_completion_tokens: u64,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_completion_tokens,
        }
    }

    fn payload(&self, image_base64: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": [{ "type": "text", "text": SYSTEM_PROMPT }],
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:image/jpeg;base64,{}", image_base64),
                            },
                        },
                    ],
                },
            ],
            "response_format": { "type": "json_object" },
            "temperature": 1,
            "max_completion_tokens": self.max_completion_tokens,
            "top_p": 1,
            "frequency_penalty": 0,
            "presence_penalty": 0,
        })
    }
}

#[async_trait]
impl VisionBackend for OpenAiBackend {
    async fn describe(&self, image_base64: &str) -> Result<String, PerceptionError> {
        let endpoint = format!("{}/chat/completions", self.api_base);
        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&self.payload(image_base64))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PerceptionError::Status(response.status()));
        }
        let parsed: Value = response.json().await?;
        parsed
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .ok_or(PerceptionError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_fixed_sampling_parameters() {
        let backend = OpenAiBackend::new("https://api.openai.com/v1", "sk-test", "gpt-4o", 2048);
        let payload = backend.payload("QUJD");
        assert_eq!(payload["model"], "gpt-4o");
        assert_eq!(payload["temperature"], 1);
        assert_eq!(payload["max_completion_tokens"], 2048);
        assert_eq!(payload["response_format"]["type"], "json_object");
        let image_url = payload["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert_eq!(image_url, "data:image/jpeg;base64,QUJD");
    }
}
