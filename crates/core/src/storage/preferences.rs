use crate::llm::ProviderConfig;
use crate::storage::kv;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

pub const AI_CONFIG_KEY: &str = "reserve_advisor:ai_config";
pub const EXPERIENCE_LEVEL_KEY: &str = "reserve_advisor:experience_level";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl std::str::FromStr for ExperienceLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::domain::parse_tag(s, "experience level")
    }
}

/// Stored provider config, with retired model aliases rewritten on the way out.
pub async fn load_ai_config(pool: &SqlitePool) -> anyhow::Result<Option<ProviderConfig>> {
    let config: Option<ProviderConfig> = kv::get_json(pool, AI_CONFIG_KEY).await?;
    Ok(config.map(ProviderConfig::normalized))
}

pub async fn store_ai_config(pool: &SqlitePool, config: &ProviderConfig) -> anyhow::Result<()> {
    let config = config.clone().normalized();
    tracing::info!(provider = config.provider.id(), model = %config.model, "ai config saved");
    kv::put_json(pool, AI_CONFIG_KEY, &config).await
}

pub async fn load_experience_level(pool: &SqlitePool) -> anyhow::Result<Option<ExperienceLevel>> {
    kv::get_json(pool, EXPERIENCE_LEVEL_KEY).await
}

pub async fn store_experience_level(pool: &SqlitePool, level: ExperienceLevel) -> anyhow::Result<()> {
    kv::put_json(pool, EXPERIENCE_LEVEL_KEY, &level).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use crate::storage::memory_pool;

    #[tokio::test]
    async fn ai_config_is_normalized_on_load() {
        let pool = memory_pool().await.unwrap();
        // Written by an older build, before alias rewriting.
        kv::put_json(
            &pool,
            AI_CONFIG_KEY,
            &serde_json::json!({
                "provider": "gemini",
                "model": "gemini-2.5-pro-latest",
                "temperature": 0.5,
                "api_key": "k"
            }),
        )
        .await
        .unwrap();

        let config = load_ai_config(&pool).await.unwrap().unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn experience_level_round_trips() {
        let pool = memory_pool().await.unwrap();
        assert!(load_experience_level(&pool).await.unwrap().is_none());
        store_experience_level(&pool, ExperienceLevel::Advanced).await.unwrap();
        assert_eq!(
            load_experience_level(&pool).await.unwrap(),
            Some(ExperienceLevel::Advanced)
        );
        assert_eq!("intermediate".parse::<ExperienceLevel>().unwrap(), ExperienceLevel::Intermediate);
    }
}
