use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{ChatRole, GenerateRequest, GenerateResponse, LlmClient, Provider, ResponseFormat};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const TOOL_NAME_EMIT_JSON: &str = "emit_json";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str, settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            http: settings.http_client()?,
            api_key: api_key.to_string(),
            base_url: settings
                .anthropic_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.to_string(),
            max_tokens: settings.anthropic_max_tokens,
        })
    }

    async fn create_message(
        &self,
        req: &CreateMessageRequest,
    ) -> anyhow::Result<(String, CreateMessageResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::from_http(Provider::Anthropic, status, text).into());
        }

        let parsed = serde_json::from_str::<CreateMessageResponse>(&text)
            .with_context(|| format!("failed to decode Anthropic response: {text}"))?;
        Ok((text, parsed))
    }

    fn tools() -> Vec<Tool> {
        vec![Tool {
            name: TOOL_NAME_EMIT_JSON,
            description: "Emit the final answer as a single JSON object",
            input_schema: serde_json::json!({"type": "object"}),
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_JSON,
        }
    }

    fn build_request(&self, request: &GenerateRequest, max_tokens: u32) -> CreateMessageRequest {
        let json = request.response_format == ResponseFormat::Json;
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            system: request.system.clone(),
            temperature: request.temperature,
            messages: request
                .messages
                .iter()
                .map(|m| Message {
                    role: match m.role {
                        ChatRole::User => "user",
                        ChatRole::Model => "assistant",
                    },
                    content: m.content.clone(),
                })
                .collect(),
            tools: json.then(Self::tools),
            tool_choice: json.then(Self::tool_choice),
        }
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// The forced tool's input, re-serialized so callers see ordinary JSON text.
    fn response_tool_json(res: &CreateMessageResponse) -> Option<String> {
        res.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } if name == TOOL_NAME_EMIT_JSON => {
                Some(input.to_string())
            }
            _ => None,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
        if request.grounding {
            tracing::debug!("anthropic has no search grounding; generating without it");
        }

        let (mut raw, mut res) = self
            .create_message(&self.build_request(&request, self.max_tokens))
            .await?;

        // If the model hit max_tokens, retry once with a higher ceiling.
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            let bumped = self.max_tokens.saturating_mul(2).max(4096);
            tracing::warn!(
                from = self.max_tokens,
                to = bumped,
                "Anthropic stop_reason=max_tokens; retrying once with higher max_tokens"
            );
            let (r, parsed) = self
                .create_message(&self.build_request(&request, bumped))
                .await?;
            raw = r;
            res = parsed;
        }

        let text = Self::response_tool_json(&res).unwrap_or_else(|| Self::response_text(&res));
        if text.trim().is_empty() {
            return Err(LlmDiagnosticsError::empty_response(Provider::Anthropic, Some(raw)).into());
        }
        Ok(GenerateResponse {
            text,
            grounding_queries: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}
