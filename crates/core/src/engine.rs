//! Deterministic allocation rule engine: maps a wizard profile to named asset
//! buckets in three layers and a risk budget. No optimization involved.

use crate::domain::wizard::{Horizon, Objective, RiskProfile, WizardInput};
use crate::market::{self, AnalysisAsset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerStructure {
    pub immediate: Vec<String>,
    pub stability: Vec<String>,
    pub growth: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    pub asset_classes: Vec<String>,
    /// Fraction of the amount that may be exposed to risk (0..=1).
    pub max_risk_exposure: f64,
    pub max_risk_amount: f64,
    pub analysis_assets: Vec<AnalysisAsset>,
    pub layers: LayerStructure,
}

impl RiskProfile {
    pub fn max_risk_exposure(&self) -> f64 {
        match self {
            RiskProfile::Conservative => 0.05,
            RiskProfile::Moderate => 0.20,
            RiskProfile::Aggressive => 0.50,
        }
    }
}

pub fn run_engine(input: &WizardInput) -> EngineResult {
    let profile = input.risk_profile;
    let max_risk_exposure = profile.max_risk_exposure();
    let mut layers = LayerStructure::default();

    if input.has_objective(Objective::EmergencyReserve) || input.horizon == Horizon::DailyLiquidity {
        layers.immediate.push("Remunerated account (100% CDI)".to_string());
        layers.immediate.push("Tesouro Selic (daily liquidity)".to_string());
    } else {
        layers.immediate.push("Tesouro Selic".to_string());
    }

    if profile == RiskProfile::Conservative {
        layers.stability.push("Large-bank CDBs".to_string());
        layers.stability.push("LCI/LCA (income-tax exempt)".to_string());
    } else {
        layers.stability.push("Mid-size bank CDBs (rating A)".to_string());
        layers.stability.push("Active fixed-income funds".to_string());
    }

    let wants_growth = input.has_objective(Objective::Retirement)
        || input.has_objective(Objective::WealthGrowth)
        || input.horizon == Horizon::LongTerm
        || profile == RiskProfile::Aggressive;
    if wants_growth {
        layers.growth.push("Tesouro IPCA+ (long term)".to_string());
        if profile != RiskProfile::Conservative {
            layers.growth.push("Diversified ETFs".to_string());
            layers.growth.push("Equity funds / FIIs".to_string());
        }
    }

    let mut asset_classes: Vec<String> = Vec::new();
    for name in layers
        .immediate
        .iter()
        .chain(&layers.stability)
        .chain(&layers.growth)
    {
        if !asset_classes.contains(name) {
            asset_classes.push(name.clone());
        }
    }

    EngineResult {
        asset_classes,
        max_risk_exposure,
        max_risk_amount: input.amount * max_risk_exposure,
        analysis_assets: market::analysis_assets(&input.country),
        layers,
    }
}
