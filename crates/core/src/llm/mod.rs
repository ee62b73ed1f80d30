pub mod anthropic;
pub mod dispatch;
pub mod error;
pub mod gemini;
pub mod json;
pub mod openai;
pub mod retry;

use crate::llm::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "groq")]
    Groq,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "xai")]
    Xai,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const fn model(id: &'static str, name: &'static str, description: &'static str) -> ModelInfo {
    ModelInfo {
        id,
        name,
        description,
    }
}

const GEMINI_MODELS: &[ModelInfo] = &[
    model("gemini-2.5-flash", "Gemini 2.5 Flash", "Fast and versatile."),
    model("gemini-2.5-pro", "Gemini 2.5 Pro", "Most capable for complex tasks."),
];
const OPENAI_MODELS: &[ModelInfo] = &[
    model("gpt-4o", "GPT-4o", "Full model with structured JSON support."),
    model("gpt-4o-mini", "GPT-4o Mini", "Lighter and cheaper, native JSON mode."),
    model("gpt-4.1", "GPT-4.1", "Advanced model; requires account access."),
];
const ANTHROPIC_MODELS: &[ModelInfo] = &[
    model("claude-3-5-sonnet-latest", "Claude 3.5 Sonnet", "Balanced performance and cost."),
    model("claude-3-opus-20240229", "Claude 3 Opus", "Maximum capability."),
];
const GROQ_MODELS: &[ModelInfo] = &[model("llama3-8b-8192", "LLaMA3 8b", "Real-time, ultra fast.")];
const DEEPSEEK_MODELS: &[ModelInfo] = &[model("deepseek-chat", "DeepSeek Chat", "Open model.")];
const XAI_MODELS: &[ModelInfo] = &[model("grok-1", "Grok-1", "xAI model.")];

impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::Gemini,
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Groq,
        Provider::DeepSeek,
        Provider::Xai,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Groq => "groq",
            Provider::DeepSeek => "deepseek",
            Provider::Xai => "xai",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Provider::Gemini => "Google AI Studio (Gemini)",
            Provider::OpenAi => "OpenAI (ChatGPT)",
            Provider::Anthropic => "Anthropic (Claude)",
            Provider::Groq => "Groq",
            Provider::DeepSeek => "DeepSeek",
            Provider::Xai => "xAI (Grok)",
        }
    }

    /// Whether an adapter exists. Callers can use this to disable choices up front.
    pub fn is_implemented(&self) -> bool {
        matches!(self, Provider::Gemini | Provider::OpenAi | Provider::Anthropic)
    }

    pub fn models(&self) -> &'static [ModelInfo] {
        match self {
            Provider::Gemini => GEMINI_MODELS,
            Provider::OpenAi => OPENAI_MODELS,
            Provider::Anthropic => ANTHROPIC_MODELS,
            Provider::Groq => GROQ_MODELS,
            Provider::DeepSeek => DEEPSEEK_MODELS,
            Provider::Xai => XAI_MODELS,
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.models()[0].id
    }

    /// Maps retired aliases to the model ids the provider currently serves.
    pub fn normalize_model(&self, model: &str) -> String {
        let model = model.trim();
        match (self, model) {
            (Provider::Gemini, "gemini-2.5-flash-latest") => "gemini-2.5-flash".to_string(),
            (Provider::Gemini, "gemini-2.5-pro-latest") => "gemini-2.5-pro".to_string(),
            _ => model.to_string(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == needle || p.label().to_lowercase() == needle)
            .ok_or_else(|| anyhow::anyhow!("unknown provider: {s}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub id: Provider,
    pub label: &'static str,
    pub implemented: bool,
    pub models: &'static [ModelInfo],
}

pub fn provider_catalog() -> Vec<ProviderInfo> {
    Provider::ALL
        .into_iter()
        .map(|p| ProviderInfo {
            id: p,
            label: p.label(),
            implemented: p.is_implemented(),
            models: p.models(),
        })
        .collect()
}

/// Per-request provider selection. Passed explicitly into every pipeline call.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model: String,
    pub temperature: f32,
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &if self.api_key.is_empty() { "<empty>" } else { "<redacted>" })
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            model: Provider::Gemini.default_model().to_string(),
            temperature: 0.7,
            api_key: String::new(),
        }
    }
}

impl ProviderConfig {
    pub fn normalized(mut self) -> Self {
        self.model = self.provider.normalize_model(&self.model);
        if self.model.is_empty() {
            self.model = self.provider.default_model().to_string();
        }
        self.api_key = self.api_key.trim().to_string();
        self
    }

    /// Switches provider and resets the model to that provider's default.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        if provider != self.provider {
            self.provider = provider;
            self.model = provider.default_model().to_string();
        }
        self
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(ConfigError::MissingApiKey {
                provider: self.provider,
            });
        }
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "assistant")]
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Provider-neutral generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub response_format: ResponseFormat,
    /// Ask the provider to ground the answer with live web search, if it can.
    pub grounding: bool,
}

impl GenerateRequest {
    pub fn json(system: &str, prompt: String, temperature: f32) -> Self {
        Self {
            system: Some(system.to_string()),
            messages: vec![ChatMessage::user(prompt)],
            temperature,
            response_format: ResponseFormat::Json,
            grounding: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub text: String,
    /// Search queries reported by grounded providers.
    pub grounding_queries: Vec<String>,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    fn supports_grounding(&self) -> bool {
        false
    }

    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_ids_and_labels() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(
            "Google AI Studio (Gemini)".parse::<Provider>().unwrap(),
            Provider::Gemini
        );
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn normalizes_retired_gemini_aliases() {
        let config = ProviderConfig {
            model: "gemini-2.5-flash-latest".to_string(),
            api_key: "  key ".to_string(),
            ..ProviderConfig::default()
        }
        .normalized();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.api_key, "key");
    }

    #[test]
    fn switching_provider_resets_model() {
        let config = ProviderConfig::default().with_provider(Provider::OpenAi);
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn blank_api_key_is_a_config_error() {
        let config = ProviderConfig {
            api_key: "   ".to_string(),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey { provider: Provider::Gemini })
        ));
    }

    #[test]
    fn debug_output_never_contains_the_key() {
        let config = ProviderConfig {
            api_key: "sk-secret".to_string(),
            ..ProviderConfig::default()
        };
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn catalog_flags_unimplemented_providers() {
        let catalog = provider_catalog();
        let groq = catalog.iter().find(|p| p.id == Provider::Groq).unwrap();
        assert!(!groq.implemented);
        assert!(catalog.iter().filter(|p| p.implemented).count() == 3);
    }
}
