use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{ChatRole, GenerateRequest, GenerateResponse, LlmClient, Provider, ResponseFormat};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: &str, settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            http: settings.http_client()?,
            api_key: api_key.to_string(),
            base_url: settings
                .openai_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.to_string(),
        })
    }

    async fn chat_completion(
        &self,
        req: &ChatCompletionRequest,
    ) -> anyhow::Result<(String, ChatCompletionResponse)> {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::from_http(Provider::OpenAi, status, text).into());
        }

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to decode OpenAI response: {text}"))?;
        Ok((text, parsed))
    }

    fn build_request(&self, request: &GenerateRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(Message {
                role: "system",
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| Message {
            role: match m.role {
                ChatRole::User => "user",
                ChatRole::Model => "assistant",
            },
            content: m.content.clone(),
        }));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            response_format: (request.response_format == ResponseFormat::Json).then_some(
                ResponseFormatSpec {
                    kind: "json_object",
                },
            ),
        }
    }

    fn response_text(res: ChatCompletionResponse) -> String {
        let Some(choice) = res.choices.into_iter().next() else {
            return String::new();
        };
        match choice.message.content {
            Some(MessageContent::Text(text)) => text,
            Some(MessageContent::Parts(parts)) => parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join(""),
            None => String::new(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let (raw, res) = self.chat_completion(&self.build_request(&request)).await?;
        let text = Self::response_text(res);
        if text.trim().is_empty() {
            return Err(LlmDiagnosticsError::empty_response(Provider::OpenAi, Some(raw)).into());
        }
        Ok(GenerateResponse {
            text,
            grounding_queries: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatSpec>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormatSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<MessageContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use serde_json::json;

    fn client() -> OpenAiClient {
        OpenAiClient::new("sk-test", "gpt-4o", &Settings::default()).unwrap()
    }

    #[test]
    fn json_request_puts_system_first_and_asks_for_json_object() {
        let req = GenerateRequest::json("sys", "prompt".to_string(), 0.2);
        let body = serde_json::to_value(client().build_request(&req)).unwrap();
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "sys"}));
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "prompt"}));
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
    }

    #[test]
    fn text_request_has_no_response_format() {
        let req = GenerateRequest {
            system: None,
            messages: vec![ChatMessage::user("q"), ChatMessage::model("a")],
            temperature: 0.7,
            response_format: ResponseFormat::Text,
            grounding: false,
        };
        let body = serde_json::to_value(client().build_request(&req)).unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"][1]["role"], "assistant");
    }

    #[test]
    fn reads_string_and_array_content() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "{\"a\":1}"}}]
        }))
        .unwrap();
        assert_eq!(OpenAiClient::response_text(res), "{\"a\":1}");

        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": [{"type": "text", "text": "x"}, {"type": "text", "text": "y"}]}}]
        }))
        .unwrap();
        assert_eq!(OpenAiClient::response_text(res), "xy");
    }

    #[test]
    fn missing_content_is_empty() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": null}}]
        }))
        .unwrap();
        assert!(OpenAiClient::response_text(res).is_empty());
    }
}
