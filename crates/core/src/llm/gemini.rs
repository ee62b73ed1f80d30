use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{ChatRole, GenerateRequest, GenerateResponse, LlmClient, Provider, ResponseFormat};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            http: settings.http_client()?,
            api_key: api_key.to_string(),
            base_url: settings
                .gemini_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.to_string(),
        })
    }

    async fn generate_content(
        &self,
        req: &GenerateContentRequest,
    ) -> anyhow::Result<(String, GenerateContentResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::from_http(Provider::Gemini, status, text).into());
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&text)
            .with_context(|| format!("failed to decode Gemini response: {text}"))?;
        Ok((text, parsed))
    }

    fn build_request(request: &GenerateRequest) -> GenerateContentRequest {
        let contents = request
            .messages
            .iter()
            .map(|m| Content {
                role: Some(match m.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                }),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let system_instruction = request.system.as_ref().map(|s| Content {
            role: None,
            parts: vec![Part { text: s.clone() }],
        });

        // Gemini rejects a JSON mime type together with the search tool.
        let response_mime_type = match (request.response_format, request.grounding) {
            (ResponseFormat::Json, false) => Some("application/json"),
            _ => None,
        };

        let tools = if request.grounding {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                response_mime_type,
            },
            tools,
        }
    }

    fn into_response(res: GenerateContentResponse) -> GenerateResponse {
        let Some(candidate) = res.candidates.into_iter().next() else {
            return GenerateResponse::default();
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let grounding_queries = candidate
            .grounding_metadata
            .map(|g| g.web_search_queries)
            .unwrap_or_default();

        GenerateResponse {
            text,
            grounding_queries,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn supports_grounding(&self) -> bool {
        true
    }

    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let body = Self::build_request(&request);
        let (raw, res) = self.generate_content(&body).await?;
        let out = Self::into_response(res);
        tracing::debug!(
            model = %self.model,
            grounded = request.grounding,
            text_len = out.text.len(),
            queries = out.grounding_queries.len(),
            "gemini response received"
        );
        if out.text.trim().is_empty() {
            return Err(LlmDiagnosticsError::empty_response(Provider::Gemini, Some(raw)).into());
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Clone, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GroundingMetadata {
    #[serde(default, rename = "webSearchQueries")]
    web_search_queries: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use serde_json::json;

    fn request(grounding: bool) -> GenerateRequest {
        GenerateRequest {
            system: Some("sys".to_string()),
            messages: vec![ChatMessage::user("hi"), ChatMessage::model("hello")],
            temperature: 0.1,
            response_format: ResponseFormat::Json,
            grounding,
        }
    }

    #[test]
    fn ungrounded_json_request_sets_mime_type() {
        let body = serde_json::to_value(GeminiClient::build_request(&request(false))).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]}
                ],
                "systemInstruction": {"parts": [{"text": "sys"}]},
                "generationConfig": {"temperature": 0.1f32, "responseMimeType": "application/json"}
            })
        );
    }

    #[test]
    fn grounded_request_adds_search_tool_without_mime_type() {
        let body = serde_json::to_value(GeminiClient::build_request(&request(true))).unwrap();
        assert_eq!(body["tools"], json!([{"google_search": {}}]));
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn joins_parts_and_reads_grounding_queries() {
        let raw = json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]},
                "groundingMetadata": {"webSearchQueries": ["selic hoje"]}
            }]
        });
        let res: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let out = GeminiClient::into_response(res);
        assert_eq!(out.text, "{\"a\":1}");
        assert_eq!(out.grounding_queries, vec!["selic hoje".to_string()]);
    }

    #[test]
    fn no_candidates_yields_empty_text() {
        let res: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(GeminiClient::into_response(res).text.is_empty());
    }
}
