//! Lenient shapes for what a model actually sends back, plus the validation
//! that turns them into the strict domain types.
//!
//! Models drift from the requested schema in small ways (a string where a list
//! was asked for, `"25%"` instead of `25`, camelCase keys). These contracts
//! absorb that drift; anything that still cannot be used is reported as an
//! error so the caller can pick its fallback.

use crate::domain::advisory::{AdvancedAnalysis, AdvisoryOutput, Provenance, Recommendation};
use crate::domain::panorama::{CryptoWatch, EquityWatch, FixedIncomeHighlight, MarketTheme};
use crate::domain::{tag_from_value, Level};
use anyhow::ensure;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const DEFAULT_ADVISORY_DISCLAIMER: &str =
    "Educational diagnostic. This is not an investment recommendation.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmAdvisoryOutput {
    #[serde(deserialize_with = "lenient_text")]
    pub summary: String,
    pub recommendations: Vec<Value>,
    pub alternatives: Vec<Value>,
    #[serde(deserialize_with = "lenient_strings")]
    pub assumptions: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub disclaimer: String,
    #[serde(alias = "advancedAnalysis")]
    pub advanced_analysis: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmRecommendation {
    #[serde(alias = "name", deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(alias = "why", deserialize_with = "lenient_text")]
    pub rationale: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub pros: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub cons: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub liquidity: String,
    #[serde(deserialize_with = "lenient_text")]
    pub risk: String,
    #[serde(deserialize_with = "lenient_text")]
    pub term: String,
    #[serde(alias = "allocationPercent", deserialize_with = "lenient_number")]
    pub allocation_percent: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub taxation: String,
    #[serde(deserialize_with = "lenient_text")]
    pub protection: String,
    #[serde(deserialize_with = "lenient_text")]
    pub how_to: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub attention_points: Vec<String>,
}

impl LlmAdvisoryOutput {
    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        ensure!(value.is_object(), "allocation response must be a JSON object");
        Ok(serde_json::from_value(value)?)
    }

    /// Converts into the strict contract. Fails when no usable recommendation
    /// survives, which callers treat as "the model response is unusable".
    pub fn validate_and_into_output(self) -> anyhow::Result<AdvisoryOutput> {
        ensure!(
            !self.recommendations.is_empty(),
            "allocation response has no recommendations"
        );

        let recommendations = into_recommendations(self.recommendations);
        ensure!(
            !recommendations.is_empty(),
            "allocation response has no usable recommendations"
        );
        let alternatives = into_recommendations(self.alternatives);

        let advanced_analysis = self.advanced_analysis.and_then(|v| {
            serde_json::from_value::<AdvancedAnalysis>(v)
                .map_err(|err| {
                    tracing::warn!(error = %err, "dropping advanced analysis block that does not match schema");
                })
                .ok()
        });

        let summary = self.summary.trim().to_string();
        let disclaimer = match self.disclaimer.trim() {
            "" => DEFAULT_ADVISORY_DISCLAIMER.to_string(),
            d => d.to_string(),
        };

        Ok(AdvisoryOutput {
            summary,
            recommendations,
            alternatives,
            assumptions: self.assumptions,
            disclaimer,
            advanced_analysis,
            provenance: Provenance::Model,
        })
    }
}

fn into_recommendations(items: Vec<Value>) -> Vec<Recommendation> {
    items
        .into_iter()
        .filter_map(|v| serde_json::from_value::<LlmRecommendation>(v).ok())
        .filter_map(LlmRecommendation::validate_and_into_recommendation)
        .collect()
}

impl LlmRecommendation {
    fn validate_and_into_recommendation(self) -> Option<Recommendation> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let allocation_percent = self
            .allocation_percent
            .filter(|p| p.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);

        Some(Recommendation {
            title,
            rationale: self.rationale.trim().to_string(),
            pros: self.pros,
            cons: self.cons,
            liquidity: self.liquidity,
            risk: self.risk,
            term: self.term,
            allocation_percent,
            taxation: self.taxation,
            protection: self.protection,
            how_to: self.how_to,
            attention_points: self.attention_points,
        })
    }
}

/// Panorama as returned by a model. Every part is optional; normalization
/// backfills what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmPanorama {
    #[serde(alias = "marketOverview")]
    pub market_overview: Option<LlmMarketOverview>,
    pub sections: Option<LlmPanoramaSections>,
    #[serde(alias = "warnings", deserialize_with = "lenient_strings")]
    pub general_warnings: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub disclaimer: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmMarketOverview {
    #[serde(deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(alias = "interestRate", deserialize_with = "lenient_number")]
    pub interest_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub inflation: Option<f64>,
    #[serde(deserialize_with = "lenient_enum")]
    pub volatility: Option<Level>,
    #[serde(deserialize_with = "lenient_text")]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmPanoramaSections {
    #[serde(deserialize_with = "lenient_items")]
    pub equities: Vec<EquityWatch>,
    #[serde(deserialize_with = "lenient_items")]
    pub fixed_income: Vec<FixedIncomeHighlight>,
    #[serde(deserialize_with = "lenient_items")]
    pub crypto: Vec<CryptoWatch>,
    #[serde(deserialize_with = "lenient_items")]
    pub other_themes: Vec<MarketTheme>,
}

impl LlmPanorama {
    /// Never fails: a value of the wrong shape yields an empty panorama.
    pub fn from_value_lenient(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "panorama response did not match schema; backfilling everything");
            Self::default()
        })
    }
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(value_text(&v).unwrap_or_default())
}

fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

fn lenient_enum<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(tag_from_value(Value::deserialize(d)?))
}

fn lenient_items<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::panorama::{FixedIncomeKind, Indexer, Redemption};
    use serde_json::json;

    #[test]
    fn accepts_camel_case_and_string_percentages() {
        let v = json!({
            "summary": "Plan",
            "recommendations": [{
                "title": "Tesouro Selic",
                "why": "liquidity",
                "pros": "fast access",
                "cons": ["low return"],
                "liquidity": "High",
                "risk": "Low",
                "term": "Short",
                "allocationPercent": "40%"
            }],
            "disclaimer": ""
        });

        let output = LlmAdvisoryOutput::from_value(v)
            .unwrap()
            .validate_and_into_output()
            .unwrap();
        assert_eq!(output.recommendations.len(), 1);
        let rec = &output.recommendations[0];
        assert_eq!(rec.rationale, "liquidity");
        assert_eq!(rec.pros, vec!["fast access".to_string()]);
        assert_eq!(rec.allocation_percent, 40.0);
        assert_eq!(output.disclaimer, DEFAULT_ADVISORY_DISCLAIMER);
        assert_eq!(output.provenance, Provenance::Model);
    }

    #[test]
    fn rejects_empty_recommendations() {
        let v = json!({"summary": "x", "recommendations": []});
        let parsed = LlmAdvisoryOutput::from_value(v).unwrap();
        assert!(parsed.validate_and_into_output().is_err());
    }

    #[test]
    fn rejects_recommendations_without_titles() {
        let v = json!({"recommendations": [{"why": "no title"}, {"title": "  "}]});
        let parsed = LlmAdvisoryOutput::from_value(v).unwrap();
        assert!(parsed.validate_and_into_output().is_err());
    }

    #[test]
    fn clamps_allocation_percent() {
        let v = json!({"recommendations": [
            {"title": "A", "allocation_percent": 140},
            {"title": "B", "allocation_percent": -3},
            {"title": "C"}
        ]});
        let output = LlmAdvisoryOutput::from_value(v)
            .unwrap()
            .validate_and_into_output()
            .unwrap();
        let pct: Vec<f64> = output
            .recommendations
            .iter()
            .map(|r| r.allocation_percent)
            .collect();
        assert_eq!(pct, vec![100.0, 0.0, 0.0]);
    }

    #[test]
    fn drops_malformed_advanced_block_but_keeps_output() {
        let v = json!({
            "recommendations": [{"title": "A"}],
            "advanced_analysis": {"examples_analyzed": "not a list"}
        });
        let output = LlmAdvisoryOutput::from_value(v)
            .unwrap()
            .validate_and_into_output()
            .unwrap();
        assert!(output.advanced_analysis.is_none());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(LlmAdvisoryOutput::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn panorama_skips_bad_items_and_reads_overview() {
        let v = json!({
            "market_overview": {"summary": "Calm", "interestRate": "10,5%", "volatility": "low"},
            "sections": {
                "equities": [
                    {"symbol": "VALE3", "name": "Vale", "price": 68.2},
                    {"name": "missing symbol"}
                ],
                "crypto": "none"
            }
        });
        let parsed = LlmPanorama::from_value_lenient(&v);
        let overview = parsed.market_overview.unwrap();
        assert_eq!(overview.interest_rate, Some(10.5));
        assert_eq!(overview.volatility, Some(Level::Low));
        let sections = parsed.sections.unwrap();
        assert_eq!(sections.equities.len(), 1);
        assert!(sections.crypto.is_empty());
    }

    #[test]
    fn panorama_items_accept_mixed_case_tags() {
        let v = json!({
            "sections": {
                "equities": [
                    {"symbol": "PETR4", "volatility": "Medium", "liquidity": "High"},
                    {"symbol": "VALE3", "volatility": "high"}
                ],
                "fixed_income": [
                    {"type": "cdb", "indexer": "Cdi", "liquidity": "at maturity", "why_in_dashboard": "x"}
                ],
                "crypto": [{"symbol": "BTC", "volatility": "huge"}]
            }
        });
        let sections = LlmPanorama::from_value_lenient(&v).sections.unwrap();
        let symbols: Vec<&str> = sections.equities.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["PETR4", "VALE3"]);
        assert_eq!(sections.equities[0].volatility, Level::Medium);
        assert_eq!(sections.equities[0].liquidity, Level::High);
        assert_eq!(sections.equities[1].volatility, Level::High);

        let fixed = &sections.fixed_income[0];
        assert_eq!(fixed.kind, FixedIncomeKind::Cdb);
        assert_eq!(fixed.indexer, Indexer::Cdi);
        assert_eq!(fixed.liquidity, Redemption::AtMaturity);

        assert_eq!(sections.crypto[0].volatility, Level::High);
    }
}
