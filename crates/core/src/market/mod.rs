//! Hardcoded per-country market figures and example assets.
//!
//! These are educational placeholders used to backfill model output and to
//! synthesize fallback plans. They are not live data.

use crate::domain::advisory::{AssetCategory, Trend};
use crate::domain::Level;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Country {
    Brazil,
    UnitedStates,
}

impl Country {
    pub fn name(&self) -> &'static str {
        match self {
            Country::Brazil => "Brazil",
            Country::UnitedStates => "USA",
        }
    }
}

/// Resolves the common spellings of the supported countries.
pub fn resolve_country(name: &str) -> Option<Country> {
    match name.trim().to_lowercase().as_str() {
        "brazil" | "brasil" | "br" | "bra" => Some(Country::Brazil),
        "usa" | "eua" | "us" | "united states" | "estados unidos" => Some(Country::UnitedStates),
        _ => None,
    }
}

/// Stable key for a country: the canonical name when known, else the trimmed input.
pub fn canonical_country(name: &str) -> String {
    resolve_country(name)
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| name.trim().to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketData {
    pub country: String,
    pub inflation: f64,
    pub base_rate: f64,
    pub currency_name: String,
    pub volatility: Option<Level>,
    pub notes: Option<String>,
}

pub fn market_data(country: &str) -> MarketData {
    match resolve_country(country) {
        Some(Country::Brazil) => MarketData {
            country: Country::Brazil.name().to_string(),
            inflation: 4.5,
            base_rate: 11.25,
            currency_name: "Real (BRL)".to_string(),
            volatility: Some(Level::Medium),
            notes: Some("High interest rates to keep inflation under control.".to_string()),
        },
        Some(Country::UnitedStates) => MarketData {
            country: Country::UnitedStates.name().to_string(),
            inflation: 3.2,
            base_rate: 5.5,
            currency_name: "Dollar (USD)".to_string(),
            volatility: Some(Level::Low),
            notes: Some("Fed expected to hold rates.".to_string()),
        },
        None => MarketData {
            country: country.trim().to_string(),
            inflation: 0.0,
            base_rate: 0.0,
            currency_name: "Local currency".to_string(),
            volatility: None,
            notes: None,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardAsset {
    pub symbol: &'static str,
    pub name: &'static str,
    pub category: AssetCategory,
    pub price: f64,
    pub variation: f64,
    pub volatility: Level,
    pub liquidity: Level,
    pub market_relevance: &'static str,
}

#[allow(clippy::too_many_arguments)]
const fn asset(
    symbol: &'static str,
    name: &'static str,
    category: AssetCategory,
    price: f64,
    variation: f64,
    volatility: Level,
    liquidity: Level,
    market_relevance: &'static str,
) -> DashboardAsset {
    DashboardAsset {
        symbol,
        name,
        category,
        price,
        variation,
        volatility,
        liquidity,
        market_relevance,
    }
}

const BRAZIL_ASSETS: &[DashboardAsset] = &[
    asset("PETR4", "Petrobras PN", AssetCategory::Stock, 38.50, 1.2, Level::Medium, Level::High, "High"),
    asset("VALE3", "Vale ON", AssetCategory::Stock, 68.20, -0.5, Level::Medium, Level::High, "High"),
    asset("ITUB4", "Itau Unibanco PN", AssetCategory::Stock, 34.10, 0.8, Level::Low, Level::High, "High"),
    asset("Tesouro Selic 2029", "Tesouro Selic", AssetCategory::FixedIncome, 14500.00, 0.01, Level::Low, Level::High, "High"),
    asset("CDB Bank X", "Floating-rate CDB", AssetCategory::FixedIncome, 1000.00, 0.0, Level::Low, Level::Medium, "Medium"),
    asset("BTC", "Bitcoin", AssetCategory::Crypto, 340000.00, 2.5, Level::High, Level::High, "High"),
    asset("ETH", "Ethereum", AssetCategory::Crypto, 18000.00, 1.8, Level::High, Level::High, "High"),
];

const DEFAULT_ASSETS: &[DashboardAsset] = &[
    asset("AAPL", "Apple Inc.", AssetCategory::Stock, 190.50, 0.5, Level::Medium, Level::High, "High"),
    asset("MSFT", "Microsoft Corp.", AssetCategory::Stock, 410.20, 1.2, Level::Low, Level::High, "High"),
    asset("BTC", "Bitcoin", AssetCategory::Crypto, 67000.00, 2.5, Level::High, Level::High, "High"),
];

/// Example assets shown on the dashboard and used to backfill panoramas.
pub fn dashboard_assets(country: &str) -> &'static [DashboardAsset] {
    match resolve_country(country) {
        Some(Country::Brazil) => BRAZIL_ASSETS,
        _ => DEFAULT_ASSETS,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct AnalysisAsset {
    pub symbol: String,
    pub name: String,
    pub category: AssetCategory,
    pub price: f64,
    pub price_currency: String,
    pub volatility: Level,
    pub trend: Trend,
    pub liquidity: Level,
}

/// Educational ETF examples the engine hands to the model for analysis.
pub fn analysis_assets(country: &str) -> Vec<AnalysisAsset> {
    let etf = |symbol: &str, name: &str, price: f64, currency: &str, volatility, trend| AnalysisAsset {
        symbol: symbol.to_string(),
        name: name.to_string(),
        category: AssetCategory::Etf,
        price,
        price_currency: currency.to_string(),
        volatility,
        trend,
        liquidity: Level::High,
    };

    match resolve_country(country) {
        Some(Country::Brazil) => vec![
            etf("IVVB11", "iShares S&P 500 index fund", 310.50, "BRL", Level::High, Trend::Up),
            etf("BOVA11", "iShares Ibovespa index fund", 125.20, "BRL", Level::High, Trend::Sideways),
            etf("HGLG11", "CGHG Logistica FII", 165.00, "BRL", Level::Medium, Trend::Up),
        ],
        _ => vec![
            etf("VOO", "Vanguard S&P 500 ETF", 480.00, "USD", Level::High, Trend::Up),
            etf("QQQ", "Invesco QQQ Trust", 420.00, "USD", Level::High, Trend::Up),
        ],
    }
}
