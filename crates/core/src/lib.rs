pub mod advisor;
pub mod domain;
pub mod engine;
pub mod llm;
pub mod market;
pub mod storage;
pub mod time;

pub mod config {
    use crate::llm::retry::RetryPolicy;
    use crate::llm::{Provider, ProviderConfig};
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_DATABASE_URL: &str = "sqlite://reserve_advisor.db?mode=rwc";
    const DEFAULT_TIMEOUT_SECS: u64 = 60;
    const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
    const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 3000;
    const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 4096;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: String,
        pub sentry_dsn: Option<String>,
        pub gemini_base_url: Option<String>,
        pub openai_base_url: Option<String>,
        pub anthropic_base_url: Option<String>,
        pub llm_timeout_secs: u64,
        pub llm_retry_attempts: u32,
        pub llm_retry_base_delay_ms: u64,
        pub anthropic_max_tokens: u32,
        pub panorama_cache_max_age_hours: Option<i64>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                database_url: DEFAULT_DATABASE_URL.to_string(),
                sentry_dsn: None,
                gemini_base_url: None,
                openai_base_url: None,
                anthropic_base_url: None,
                llm_timeout_secs: DEFAULT_TIMEOUT_SECS,
                llm_retry_attempts: DEFAULT_RETRY_ATTEMPTS,
                llm_retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
                anthropic_max_tokens: DEFAULT_ANTHROPIC_MAX_TOKENS,
                panorama_cache_max_age_hours: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();
            let max_age = env_var("PANORAMA_CACHE_MAX_AGE_HOURS")
                .map(|raw| parse_setting::<i64>("PANORAMA_CACHE_MAX_AGE_HOURS", Some(raw), 0))
                .transpose()?;
            if let Some(hours) = max_age {
                anyhow::ensure!(
                    hours > 0,
                    "PANORAMA_CACHE_MAX_AGE_HOURS must be positive (got {hours}); unset it for no limit"
                );
            }

            Ok(Self {
                database_url: env_var("DATABASE_URL").unwrap_or(defaults.database_url),
                sentry_dsn: env_var("SENTRY_DSN"),
                gemini_base_url: env_var("GEMINI_BASE_URL"),
                openai_base_url: env_var("OPENAI_BASE_URL"),
                anthropic_base_url: env_var("ANTHROPIC_BASE_URL"),
                llm_timeout_secs: parse_setting(
                    "LLM_TIMEOUT_SECS",
                    env_var("LLM_TIMEOUT_SECS"),
                    defaults.llm_timeout_secs,
                )?,
                llm_retry_attempts: parse_setting(
                    "LLM_RETRY_ATTEMPTS",
                    env_var("LLM_RETRY_ATTEMPTS"),
                    defaults.llm_retry_attempts,
                )?,
                llm_retry_base_delay_ms: parse_setting(
                    "LLM_RETRY_BASE_DELAY_MS",
                    env_var("LLM_RETRY_BASE_DELAY_MS"),
                    defaults.llm_retry_base_delay_ms,
                )?,
                anthropic_max_tokens: parse_setting(
                    "ANTHROPIC_MAX_TOKENS",
                    env_var("ANTHROPIC_MAX_TOKENS"),
                    defaults.anthropic_max_tokens,
                )?,
                panorama_cache_max_age_hours: max_age,
            })
        }

        pub fn retry_policy(&self) -> RetryPolicy {
            RetryPolicy {
                max_attempts: self.llm_retry_attempts.max(1),
                base_delay: Duration::from_millis(self.llm_retry_base_delay_ms),
            }
        }

        pub fn panorama_cache_max_age(&self) -> Option<chrono::Duration> {
            self.panorama_cache_max_age_hours.map(chrono::Duration::hours)
        }

        pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(self.llm_timeout_secs))
                .build()
                .context("failed to build reqwest client")
        }

        /// Provider config seeded from `AI_PROVIDER` / `AI_MODEL` / `AI_API_KEY` /
        /// `AI_TEMPERATURE`. Returns `None` when none of them is set.
        pub fn provider_config_from_env(&self) -> anyhow::Result<Option<ProviderConfig>> {
            let provider = std::env::var("AI_PROVIDER").ok();
            let model = std::env::var("AI_MODEL").ok();
            let api_key = std::env::var("AI_API_KEY").ok();
            let temperature = std::env::var("AI_TEMPERATURE").ok();
            if provider.is_none() && model.is_none() && api_key.is_none() && temperature.is_none() {
                return Ok(None);
            }

            let mut config = ProviderConfig::default();
            if let Some(p) = provider {
                let provider = p
                    .parse::<Provider>()
                    .with_context(|| format!("AI_PROVIDER is not a known provider: {p}"))?;
                config = config.with_provider(provider);
            }
            if let Some(m) = model.filter(|m| !m.trim().is_empty()) {
                config.model = m.trim().to_string();
            }
            if let Some(k) = api_key {
                config.api_key = k.trim().to_string();
            }
            if let Some(t) = temperature {
                config.temperature = t
                    .parse::<f32>()
                    .with_context(|| format!("AI_TEMPERATURE must be a number (got {t})"))?;
            }
            Ok(Some(config.normalized()))
        }
    }

    fn env_var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.trim().is_empty())
    }

    /// Unset or blank means `default`; anything else must parse.
    fn parse_setting<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match raw {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{name} is not a valid number (got {raw:?}): {e}")),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn unset_settings_use_defaults() {
            assert_eq!(parse_setting::<u64>("LLM_TIMEOUT_SECS", None, 60).unwrap(), 60);
            assert_eq!(parse_setting::<u64>("LLM_TIMEOUT_SECS", Some(" 15 ".into()), 60).unwrap(), 15);
        }

        #[test]
        fn malformed_numbers_are_config_errors() {
            let err = parse_setting::<u64>("LLM_TIMEOUT_SECS", Some("60s".into()), 60).unwrap_err();
            let text = err.to_string();
            assert!(text.contains("LLM_TIMEOUT_SECS"));
            assert!(text.contains("60s"));
            assert!(parse_setting::<u32>("LLM_RETRY_ATTEMPTS", Some("-1".into()), 3).is_err());
        }
    }
}
