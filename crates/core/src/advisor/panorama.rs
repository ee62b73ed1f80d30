//! Panorama normalization and the caller-side cache fallback.

use crate::domain::advisory::AssetCategory;
use crate::domain::contract::LlmPanorama;
use crate::domain::panorama::{
    CryptoWatch, EquityWatch, FixedIncomeHighlight, FixedIncomeKind, Indexer, MarketOverview,
    MarketPanorama, PanoramaSections, Redemption, TaxTreatment,
};
use crate::domain::Level;
use crate::llm::error::user_message;
use crate::llm::Provider;
use crate::market::{self, canonical_country};
use crate::storage::panorama_cache::{self, CachedPanorama};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::fmt;
use std::future::Future;

const DEFAULT_WARNING: &str = "Estimated data. Check up-to-date sources.";
const DEFAULT_DISCLAIMER: &str = "Educational content; not an investment recommendation.";

/// Which tier of the degradation chain produced a fresh panorama.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Grounded,
    Ungrounded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanoramaFetch {
    pub panorama: MarketPanorama,
    pub sources: Vec<String>,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Freshness {
    Live { tier: Tier },
    Stale { cached_at: DateTime<Utc>, notice: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanoramaView {
    pub country: String,
    pub panorama: MarketPanorama,
    pub sources: Vec<String>,
    pub freshness: Freshness,
}

/// Both tiers failed and no usable cache entry exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanoramaUnavailable {
    pub provider: Provider,
    pub detail: String,
}

impl fmt::Display for PanoramaUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not load the market panorama from {}: {}",
            self.provider, self.detail
        )
    }
}

/// Fills every part of a model panorama that is missing or empty from the
/// static market table and the country's example assets.
pub fn normalize_panorama(country: &str, value: &Value) -> MarketPanorama {
    let parsed = LlmPanorama::from_value_lenient(value);
    let data = market::market_data(country);
    let assets = market::dashboard_assets(country);
    let overview = parsed.market_overview.unwrap_or_default();
    let sections = parsed.sections.unwrap_or_default();

    let summary = match overview.summary.trim() {
        "" => format!(
            "Estimated scenario for {} ({}): base rate {}%, inflation {}%.",
            data.country, data.currency_name, data.base_rate, data.inflation
        ),
        s => s.to_string(),
    };
    let notes = Some(overview.notes.trim().to_string())
        .filter(|n| !n.is_empty())
        .or(data.notes);

    let equities = non_empty_or(sections.equities, || {
        assets
            .iter()
            .filter(|a| a.category == AssetCategory::Stock)
            .take(3)
            .map(|a| EquityWatch {
                symbol: a.symbol.to_string(),
                name: a.name.to_string(),
                price: Some(a.price),
                variation: Some(a.variation),
                volatility: a.volatility,
                liquidity: a.liquidity,
                why_in_dashboard: "Monitored asset (estimated).".to_string(),
                risk_note: "Confirm recent data before deciding.".to_string(),
            })
            .collect()
    });

    let fixed_income = non_empty_or(sections.fixed_income, || {
        assets
            .iter()
            .filter(|a| a.category == AssetCategory::FixedIncome)
            .take(2)
            .map(|a| FixedIncomeHighlight {
                kind: FixedIncomeKind::Cdb,
                indexer: Indexer::Cdi,
                liquidity: Redemption::Daily,
                tax_benefit: TaxTreatment::Taxed,
                why_in_dashboard: a.name.to_string(),
                risk_note: "Check the issuer and current conditions.".to_string(),
            })
            .collect()
    });

    let crypto = non_empty_or(sections.crypto, || {
        assets
            .iter()
            .filter(|a| a.category == AssetCategory::Crypto)
            .take(2)
            .map(|a| CryptoWatch {
                symbol: a.symbol.to_string(),
                name: a.name.to_string(),
                price: Some(a.price),
                volatility: Level::High,
                market_relevance: a.market_relevance.to_string(),
                risk_note: "Volatile asset (estimated).".to_string(),
            })
            .collect()
    });

    let general_warnings = non_empty_or(parsed.general_warnings, || vec![DEFAULT_WARNING.to_string()]);
    let disclaimer = match parsed.disclaimer.trim() {
        "" => DEFAULT_DISCLAIMER.to_string(),
        d => d.to_string(),
    };

    MarketPanorama {
        market_overview: MarketOverview {
            summary,
            interest_rate: overview.interest_rate.or(Some(data.base_rate)),
            inflation: overview.inflation.or(Some(data.inflation)),
            volatility: overview.volatility.or(data.volatility).or(Some(Level::Medium)),
            notes,
        },
        sections: PanoramaSections {
            equities,
            fixed_income,
            crypto,
            other_themes: sections.other_themes,
        },
        general_warnings,
        disclaimer,
    }
}

fn non_empty_or<T>(items: Vec<T>, fallback: impl FnOnce() -> Vec<T>) -> Vec<T> {
    if items.is_empty() {
        fallback()
    } else {
        items
    }
}

/// Awaits `fetch` and applies the cache policy around it.
///
/// Success overwrites the country's cache entry. Failure serves the cached
/// entry, if one exists and is not older than `max_age`, with a stale notice;
/// otherwise the failure surfaces as [`PanoramaUnavailable`] on top of the
/// original error.
pub async fn resolve_panorama<F>(
    pool: &SqlitePool,
    country: &str,
    provider: Provider,
    fetch: F,
    now: DateTime<Utc>,
    max_age: Option<chrono::Duration>,
) -> anyhow::Result<PanoramaView>
where
    F: Future<Output = anyhow::Result<PanoramaFetch>>,
{
    let country = canonical_country(country);

    let err = match fetch.await {
        Ok(fresh) => {
            let entry = CachedPanorama {
                cached_at: now,
                payload: fresh.panorama,
                sources: fresh.sources,
            };
            panorama_cache::store(pool, &country, &entry).await?;
            return Ok(PanoramaView {
                country,
                panorama: entry.payload,
                sources: entry.sources,
                freshness: Freshness::Live { tier: fresh.tier },
            });
        }
        Err(err) => err,
    };

    let detail = user_message(&err, Some(provider));
    let cached = match panorama_cache::load(pool, &country).await {
        Ok(cached) => cached,
        Err(cache_err) => {
            tracing::warn!(%country, error = %cache_err, "panorama cache unreadable; treating as empty");
            None
        }
    };
    let cached = cached.filter(|c| match max_age {
        Some(max_age) => now.signed_duration_since(c.cached_at) <= max_age,
        None => true,
    });

    match cached {
        Some(entry) => {
            tracing::warn!(
                %country,
                provider = provider.id(),
                cached_at = %entry.cached_at,
                error = %err,
                "panorama fetch failed; serving cached copy"
            );
            Ok(PanoramaView {
                country,
                panorama: entry.payload,
                sources: entry.sources,
                freshness: Freshness::Stale {
                    cached_at: entry.cached_at,
                    notice: format!("Stale data, last error with {provider}: {detail}"),
                },
            })
        }
        None => Err(err.context(PanoramaUnavailable { provider, detail })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_pool;
    use chrono::TimeZone;
    use serde_json::json;

    fn fetched(summary: &str) -> PanoramaFetch {
        PanoramaFetch {
            panorama: normalize_panorama("Brazil", &json!({"market_overview": {"summary": summary}})),
            sources: vec!["selic".to_string()],
            tier: Tier::Grounded,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, hour, 0, 0).unwrap()
    }

    #[test]
    fn empty_object_is_fully_backfilled() {
        let p = normalize_panorama("Brasil", &json!({}));
        assert_eq!(p.market_overview.interest_rate, Some(11.25));
        assert_eq!(p.market_overview.inflation, Some(4.5));
        assert_eq!(p.market_overview.volatility, Some(Level::Medium));
        assert!(p.market_overview.summary.contains("base rate 11.25%"));
        assert!(p.market_overview.summary.contains("Real (BRL)"));
        assert_eq!(p.sections.equities.len(), 3);
        assert_eq!(p.sections.fixed_income.len(), 2);
        assert_eq!(p.sections.fixed_income[0].kind, FixedIncomeKind::Cdb);
        assert_eq!(p.sections.crypto.len(), 2);
        assert_eq!(p.general_warnings, vec![DEFAULT_WARNING.to_string()]);
        assert!(!p.disclaimer.is_empty());
    }

    #[test]
    fn model_values_win_over_backfill() {
        let p = normalize_panorama(
            "USA",
            &json!({
                "market_overview": {"summary": "Rates on hold", "interest_rate": "5,25%", "volatility": "high"},
                "sections": {"crypto": [{"symbol": "SOL", "name": "Solana"}]},
                "general_warnings": ["Check the Fed calendar."]
            }),
        );
        assert_eq!(p.market_overview.summary, "Rates on hold");
        assert_eq!(p.market_overview.interest_rate, Some(5.25));
        assert_eq!(p.market_overview.inflation, Some(3.2));
        assert_eq!(p.market_overview.volatility, Some(Level::High));
        assert_eq!(p.sections.crypto.len(), 1);
        assert_eq!(p.sections.crypto[0].volatility, Level::High);
        assert_eq!(p.sections.equities[0].symbol, "AAPL");
        assert!(p.sections.fixed_income.is_empty());
    }

    #[test]
    fn mixed_case_model_items_are_kept_not_backfilled() {
        let p = normalize_panorama(
            "Brazil",
            &json!({"sections": {"equities": [
                {"ticker": "PETR4", "volatility": "Medium", "liquidity": "High"},
                {"ticker": "VALE3", "volatility": "high"}
            ]}}),
        );
        let symbols: Vec<&str> = p.sections.equities.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["PETR4", "VALE3"]);
        assert_eq!(p.sections.equities[0].liquidity, Level::High);
    }

    #[tokio::test]
    async fn success_is_cached_and_served_stale_on_failure() {
        let pool = memory_pool().await.unwrap();
        let live = resolve_panorama(&pool, "Brasil", Provider::Gemini, async { Ok(fetched("fresh")) }, at(9), None)
            .await
            .unwrap();
        assert_eq!(live.country, "Brazil");
        assert_eq!(live.freshness, Freshness::Live { tier: Tier::Grounded });

        let stale = resolve_panorama(
            &pool,
            "Brazil",
            Provider::Gemini,
            async { Err(anyhow::anyhow!("status=503 Service Unavailable")) },
            at(12),
            None,
        )
        .await
        .unwrap();

        assert_eq!(stale.panorama, live.panorama);
        assert_eq!(stale.sources, vec!["selic".to_string()]);
        let Freshness::Stale { cached_at, notice } = stale.freshness else {
            panic!("expected stale freshness");
        };
        assert_eq!(cached_at, at(9));
        assert!(notice.starts_with("Stale data, last error with Google AI Studio (Gemini): "));
        assert!(notice.contains("503"));
    }

    #[tokio::test]
    async fn no_cache_is_a_hard_error_naming_provider_and_detail() {
        let pool = memory_pool().await.unwrap();
        let err = resolve_panorama(
            &pool,
            "USA",
            Provider::OpenAi,
            async { Err(anyhow::anyhow!("status=401 Unauthorized")) },
            at(9),
            None,
        )
        .await
        .unwrap_err();

        let unavailable = err.downcast_ref::<PanoramaUnavailable>().unwrap();
        assert_eq!(unavailable.provider, Provider::OpenAi);
        assert!(unavailable.detail.contains("401"));
        assert!(err.to_string().contains("OpenAI (ChatGPT)"));
    }

    #[tokio::test]
    async fn cache_older_than_max_age_is_ignored() {
        let pool = memory_pool().await.unwrap();
        resolve_panorama(&pool, "Brazil", Provider::Gemini, async { Ok(fetched("old")) }, at(0), None)
            .await
            .unwrap();

        let result = resolve_panorama(
            &pool,
            "Brazil",
            Provider::Gemini,
            async { Err(anyhow::anyhow!("status=500")) },
            at(13),
            Some(chrono::Duration::hours(12)),
        )
        .await;
        assert!(result.unwrap_err().downcast_ref::<PanoramaUnavailable>().is_some());
    }
}
