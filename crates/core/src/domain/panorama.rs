use crate::domain::{lenient_tag, tag_from_value, Level};
use serde::Deserializer;
use serde::{Deserialize, Serialize};

/// Snapshot of macro indicators and example assets for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPanorama {
    pub market_overview: MarketOverview,
    pub sections: PanoramaSections,
    pub general_warnings: Vec<String>,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    pub summary: String,
    pub interest_rate: Option<f64>,
    pub inflation: Option<f64>,
    pub volatility: Option<Level>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PanoramaSections {
    pub equities: Vec<EquityWatch>,
    pub fixed_income: Vec<FixedIncomeHighlight>,
    pub crypto: Vec<CryptoWatch>,
    pub other_themes: Vec<MarketTheme>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityWatch {
    #[serde(alias = "ticker")]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub variation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub volatility: Level,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub liquidity: Level,
    #[serde(default)]
    pub why_in_dashboard: String,
    #[serde(default)]
    pub risk_note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixedIncomeKind {
    Lci,
    Lca,
    Cdb,
    Treasury,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Indexer {
    Cdi,
    Ipca,
    Prefixed,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Redemption {
    Daily,
    AtMaturity,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxTreatment {
    Exempt,
    Taxed,
    #[default]
    #[serde(other)]
    Depends,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedIncomeHighlight {
    #[serde(rename = "type", default, deserialize_with = "lenient_tag")]
    pub kind: FixedIncomeKind,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub indexer: Indexer,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub liquidity: Redemption,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub tax_benefit: TaxTreatment,
    pub why_in_dashboard: String,
    #[serde(default)]
    pub risk_note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoWatch {
    #[serde(alias = "ticker")]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "crypto_volatility", deserialize_with = "lenient_crypto_volatility")]
    pub volatility: Level,
    #[serde(default)]
    pub market_relevance: String,
    #[serde(default)]
    pub risk_note: String,
}

fn crypto_volatility() -> Level {
    Level::High
}

fn lenient_crypto_volatility<'de, D: Deserializer<'de>>(d: D) -> Result<Level, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(tag_from_value(v).unwrap_or_else(crypto_volatility))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTheme {
    pub theme: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub risk_note: String,
}
