use crate::domain::{lenient_tag, required_tag, Level};
use serde::{Deserialize, Serialize};

/// Where an [`AdvisoryOutput`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    Model,
    LocalFallback,
}

/// The normalized allocation-explanation contract returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryOutput {
    pub summary: String,
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub alternatives: Vec<Recommendation>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    pub disclaimer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced_analysis: Option<AdvancedAnalysis>,
    #[serde(default)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub rationale: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub liquidity: String,
    pub risk: String,
    pub term: String,
    /// 0..=100. Not required to sum to 100 across a list.
    pub allocation_percent: f64,
    #[serde(default)]
    pub taxation: String,
    #[serde(default)]
    pub protection: String,
    #[serde(default)]
    pub how_to: String,
    #[serde(default)]
    pub attention_points: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetCategory {
    Stock,
    Etf,
    Crypto,
    FixedIncome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Up,
    #[default]
    Sideways,
    Down,
}

/// Opt-in deeper analysis block, requested when the user picks the detailed view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedAnalysis {
    pub market_context: MarketContext,
    pub risk_budget: RiskBudget,
    pub examples_analyzed: Vec<AnalyzedExample>,
    pub allocation_examples: AllocationExamples,
    pub price_zones: Vec<PriceZone>,
    pub what_to_watch: Vec<String>,
    pub risks: Vec<String>,
    pub assumptions: Vec<String>,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketContext {
    pub summary: String,
    pub as_of: Option<String>,
    #[serde(deserialize_with = "lenient_tag")]
    pub data_quality: Level,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBudget {
    pub total_amount: f64,
    pub max_risk_exposure: f64,
    pub max_risk_amount: f64,
    pub recommended_risk_amount: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedExample {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "required_tag")]
    pub category: AssetCategory,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub volatility: Level,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub trend: Trend,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub liquidity: Level,
    #[serde(default)]
    pub why_in_scope: String,
    #[serde(default)]
    pub key_risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationExamples {
    pub risk_amount_used: f64,
    pub positions: Vec<ExamplePosition>,
    pub important_note: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamplePosition {
    pub symbol: String,
    pub estimated_unit_price: Option<f64>,
    pub estimated_units: Option<f64>,
    pub estimated_cost: Option<f64>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceZone {
    pub symbol: String,
    pub range: Option<String>,
    pub explanation: Option<String>,
    #[serde(deserialize_with = "lenient_tag")]
    pub data_confidence: Level,
}
