use crate::domain::panorama::MarketPanorama;
use crate::market::canonical_country;
use crate::storage::kv;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Last successful panorama for a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPanorama {
    pub cached_at: DateTime<Utc>,
    pub payload: MarketPanorama,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Known spellings share the canonical name; anything else is matched case-insensitively.
pub fn cache_key(country: &str) -> String {
    format!(
        "reserve_advisor:panorama:{}",
        canonical_country(country).to_lowercase()
    )
}

pub async fn load(pool: &SqlitePool, country: &str) -> anyhow::Result<Option<CachedPanorama>> {
    kv::get_json(pool, &cache_key(country)).await
}

pub async fn store(pool: &SqlitePool, country: &str, entry: &CachedPanorama) -> anyhow::Result<()> {
    kv::put_json(pool, &cache_key(country), entry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::panorama::normalize_panorama;
    use crate::storage::memory_pool;

    #[test]
    fn spellings_share_one_key() {
        assert_eq!(cache_key("Brasil"), "reserve_advisor:panorama:brazil");
        assert_eq!(cache_key(" br "), cache_key("Brazil"));
        assert_eq!(cache_key("EUA"), "reserve_advisor:panorama:usa");
        assert_eq!(cache_key("Chile"), cache_key(" chile"));
    }

    #[tokio::test]
    async fn stores_per_country() {
        let pool = memory_pool().await.unwrap();
        let entry = CachedPanorama {
            cached_at: Utc::now(),
            payload: normalize_panorama("Brazil", &serde_json::json!({})),
            sources: vec!["selic hoje".to_string()],
        };
        store(&pool, "Brasil", &entry).await.unwrap();

        assert_eq!(load(&pool, "Brazil").await.unwrap(), Some(entry.clone()));
        assert!(load(&pool, "USA").await.unwrap().is_none());

        store(&pool, "Chile", &entry).await.unwrap();
        assert_eq!(load(&pool, "CHILE").await.unwrap(), Some(entry));
    }
}
