use crate::config::Settings;
use crate::llm::anthropic::AnthropicClient;
use crate::llm::error::ConfigError;
use crate::llm::gemini::GeminiClient;
use crate::llm::openai::OpenAiClient;
use crate::llm::{LlmClient, Provider, ProviderConfig};

/// Builds the adapter for `config.provider`.
///
/// Unsupported providers are rejected before the key is looked at, and both
/// checks happen before any network traffic.
pub fn client_for(config: &ProviderConfig, settings: &Settings) -> anyhow::Result<Box<dyn LlmClient>> {
    if !config.provider.is_implemented() {
        return Err(ConfigError::UnsupportedProvider(config.provider).into());
    }
    let api_key = config.require_api_key()?;
    let model = config.provider.normalize_model(&config.model);

    tracing::debug!(provider = config.provider.id(), %model, "building llm client");
    let client: Box<dyn LlmClient> = match config.provider {
        Provider::Gemini => Box::new(GeminiClient::new(api_key, &model, settings)?),
        Provider::OpenAi => Box::new(OpenAiClient::new(api_key, &model, settings)?),
        Provider::Anthropic => Box::new(AnthropicClient::new(api_key, &model, settings)?),
        Provider::Groq | Provider::DeepSeek | Provider::Xai => {
            return Err(ConfigError::UnsupportedProvider(config.provider).into())
        }
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: Provider, api_key: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: api_key.to_string(),
            ..ProviderConfig::default()
        }
        .with_provider(provider)
    }

    #[test]
    fn unsupported_provider_wins_over_missing_key() {
        let err = client_for(&config(Provider::DeepSeek, ""), &Settings::default())
            .err()
            .unwrap();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnsupportedProvider(Provider::DeepSeek))
        );
        assert_eq!(err.to_string(), "DeepSeek not yet implemented");
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = client_for(&config(Provider::OpenAi, "  "), &Settings::default())
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingApiKey { provider: Provider::OpenAi })
        ));
    }

    #[test]
    fn builds_each_implemented_adapter() {
        for provider in Provider::ALL.into_iter().filter(Provider::is_implemented) {
            let client = client_for(&config(provider, "key"), &Settings::default()).unwrap();
            assert_eq!(client.provider(), provider);
        }
    }
}
