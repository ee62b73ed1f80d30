use crate::domain::{parse_tag, Level};
use anyhow::ensure;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Objective {
    EmergencyReserve,
    Retirement,
    Purchase,
    Travel,
    WealthGrowth,
    Other,
}

impl Objective {
    pub fn label(&self) -> &'static str {
        match self {
            Objective::EmergencyReserve => "emergency reserve",
            Objective::Retirement => "retirement",
            Objective::Purchase => "large purchase",
            Objective::Travel => "travel",
            Objective::WealthGrowth => "wealth growth",
            Objective::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Horizon {
    ShortTerm,
    MediumTerm,
    LongTerm,
    DailyLiquidity,
}

impl Horizon {
    pub fn label(&self) -> &'static str {
        match self {
            Horizon::ShortTerm => "up to 1 year",
            Horizon::MediumTerm => "1 to 5 years",
            Horizon::LongTerm => "more than 5 years",
            Horizon::DailyLiquidity => "daily liquidity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub fn label(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "Conservative",
            RiskProfile::Moderate => "Moderate",
            RiskProfile::Aggressive => "Aggressive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewMode {
    #[default]
    Simple,
    Detailed,
}

impl std::str::FromStr for Objective {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tag(s, "objective")
    }
}

impl std::str::FromStr for Horizon {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tag(s, "horizon")
    }
}

impl std::str::FromStr for RiskProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tag(s, "risk profile")
    }
}

/// Investment profile collected by the wizard. Treated as immutable once it
/// enters the advisory pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardInput {
    pub amount: f64,
    pub currency: String,
    pub country: String,
    pub objectives: Vec<Objective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_objective_detail: Option<String>,
    pub horizon: Horizon,
    pub risk_profile: RiskProfile,
    #[serde(default)]
    pub volatility_tolerance: Level,
    #[serde(default)]
    pub daily_liquidity: bool,
    #[serde(default)]
    pub prefers_protection: bool,
    #[serde(default)]
    pub accepts_oscillation: bool,
    #[serde(default)]
    pub view_mode: ViewMode,
}

impl WizardInput {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.amount.is_finite() && self.amount > 0.0,
            "amount must be a positive number (got {})",
            self.amount
        );
        ensure!(!self.currency.trim().is_empty(), "currency must be non-empty");
        ensure!(!self.country.trim().is_empty(), "country must be non-empty");
        ensure!(
            !self.objectives.is_empty(),
            "at least one investment objective is required"
        );
        Ok(())
    }

    pub fn has_objective(&self, objective: Objective) -> bool {
        self.objectives.contains(&objective)
    }

    pub fn wants_advanced_analysis(&self) -> bool {
        self.view_mode == ViewMode::Detailed
    }

    pub fn objectives_text(&self) -> String {
        let mut parts: Vec<String> = self
            .objectives
            .iter()
            .map(|o| o.label().to_string())
            .collect();
        if let Some(detail) = self
            .other_objective_detail
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            parts.push(format!("details: {detail}"));
        }
        parts.join(", ")
    }
}
