use crate::domain::wizard::WizardInput;
use crate::engine::EngineResult;
use anyhow::Context;
use chrono::NaiveDate;

pub const CHAT_SYSTEM: &str = "You are the Reserve Advisor mentor. Educational and technical.";

pub const PANORAMA_SYSTEM: &str =
    "You are a market analyst. Reply only with valid JSON that follows the requested schema.";

pub const ADVISORY_SYSTEM: &str = "You are a senior investment educator. Reply only with valid JSON \
     that follows the requested schema. Never promise returns.";

pub const NO_SEARCH_NOTE: &str =
    "(Note: do not use the search tool; answer from your most recent internal knowledge.)";

const PANORAMA_SCHEMA: &str = r#"{
  "market_overview": {
    "summary": "text",
    "interest_rate": 10.5,
    "inflation": 4.2,
    "volatility": "LOW" | "MEDIUM" | "HIGH",
    "notes": "text"
  },
  "sections": {
    "equities": [
      {"symbol": "VALE3", "name": "Vale", "price": 68.2, "variation": -0.5, "volatility": "MEDIUM", "liquidity": "HIGH", "why_in_dashboard": "text", "risk_note": "text"}
    ],
    "fixed_income": [
      {"type": "CDB", "indexer": "CDI", "liquidity": "DAILY", "tax_benefit": "TAXED", "why_in_dashboard": "text", "risk_note": "text"}
    ],
    "crypto": [
      {"symbol": "BTC", "name": "Bitcoin", "price": 340000, "volatility": "HIGH", "market_relevance": "High", "risk_note": "text"}
    ],
    "other_themes": [
      {"theme": "text", "description": "text", "risk_note": "text"}
    ]
  },
  "general_warnings": ["text"],
  "disclaimer": "text"
}"#;

const ADVISORY_SCHEMA: &str = r#"{
  "summary": "text",
  "recommendations": [
    {
      "title": "text",
      "rationale": "text",
      "pros": ["text"],
      "cons": ["text"],
      "liquidity": "text",
      "risk": "text",
      "term": "text",
      "allocation_percent": 25,
      "taxation": "text",
      "protection": "text",
      "how_to": "text",
      "attention_points": ["text"]
    }
  ],
  "alternatives": [],
  "assumptions": ["text"],
  "disclaimer": "text"
}"#;

const ADVANCED_SCHEMA: &str = r#""advanced_analysis": {
  "market_context": {"summary": "text", "as_of": "YYYY-MM-DD", "data_quality": "LOW" | "MEDIUM" | "HIGH", "notes": "text"},
  "risk_budget": {"total_amount": 0, "max_risk_exposure": 0.2, "max_risk_amount": 0, "recommended_risk_amount": 0, "reasoning": "text"},
  "examples_analyzed": [
    {"symbol": "IVVB11", "name": "text", "category": "STOCK" | "ETF" | "CRYPTO" | "FIXED_INCOME", "price": 0, "volatility": "HIGH", "trend": "UP" | "SIDEWAYS" | "DOWN", "liquidity": "HIGH", "why_in_scope": "text", "key_risks": ["text"]}
  ],
  "allocation_examples": {
    "risk_amount_used": 0,
    "positions": [{"symbol": "text", "estimated_unit_price": 0, "estimated_units": 0, "estimated_cost": 0, "notes": "text"}],
    "important_note": "text"
  },
  "price_zones": [{"symbol": "text", "range": "text", "explanation": "text", "data_confidence": "LOW"}],
  "what_to_watch": ["text"],
  "risks": ["text"],
  "assumptions": ["text"],
  "disclaimer": "text"
}"#;

pub fn panorama_prompt(country: &str, today: NaiveDate) -> String {
    format!(
        "Generate a MARKET PANORAMA JSON for {country} as of today ({today}).\n\
         Use the search tool, if available, to find real and current data.\n\n\
         Include:\n\
         1. A current macroeconomic summary.\n\
         2. The base interest rate (Selic for Brazil, Fed Funds for the USA).\n\
         3. Annualized inflation (IPCA for Brazil, CPI for the USA).\n\
         4. 3 stocks with ticker, name, approximate price and daily variation.\n\
         5. 2 attractive fixed-income options in the current scenario.\n\
         6. 2 relevant crypto assets (BTC and one more).\n\n\
         Follow this schema exactly:\n{PANORAMA_SCHEMA}\n\n\
         If some real figure is unavailable, fill it with a coherent estimate.\n\
         ANSWER WITH VALID JSON ONLY."
    )
}

pub fn explanation_prompt(input: &WizardInput, engine: &EngineResult) -> anyhow::Result<String> {
    let engine_json =
        serde_json::to_string_pretty(engine).context("failed to encode engine result for prompt")?;

    let mut prompt = format!(
        "Act as a senior investment consultant.\n\
         User context:\n\
         - Amount: {amount} {currency}\n\
         - Risk profile: {risk}\n\
         - Objectives: {objectives}\n\
         - Horizon: {horizon}\n\
         - Country: {country}\n\
         - Volatility tolerance: {volatility}\n\
         - Needs daily liquidity: {liquidity}\n\
         - Prefers capital protection: {protection}\n\
         - Accepts short-term oscillation: {oscillation}\n\n\
         Rule engine output (buckets per layer and risk budget):\n{engine_json}\n\n\
         Task:\n\
         Produce a realistic educational allocation. Split {amount} {currency} across the \
         engine's asset classes and explain each one in depth (pros, cons, liquidity, risk).\n\
         Do not use templates. Be specific to the amount of {amount}.\n\
         Never exceed the maximum risk amount of {max_risk:.2} {currency} in volatile assets.\n\n\
         Answer with valid JSON only, following this schema:\n{ADVISORY_SCHEMA}",
        amount = input.amount,
        currency = input.currency,
        risk = input.risk_profile.label(),
        objectives = input.objectives_text(),
        horizon = input.horizon.label(),
        country = input.country,
        volatility = input.volatility_tolerance.label(),
        liquidity = yes_no(input.daily_liquidity),
        protection = yes_no(input.prefers_protection),
        oscillation = yes_no(input.accepts_oscillation),
        max_risk = engine.max_risk_amount,
    );

    if input.wants_advanced_analysis() {
        prompt.push_str(&format!(
            "\n\nThe user opted into the detailed view. Also include this block at the top level, \
             analyzing the example assets listed by the engine:\n{ADVANCED_SCHEMA}"
        ));
    }
    Ok(prompt)
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wizard::tests::sample_input;
    use crate::domain::wizard::{RiskProfile, ViewMode};
    use crate::engine::run_engine;

    #[test]
    fn panorama_prompt_names_country_and_date() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        let prompt = panorama_prompt("Brazil", today);
        assert!(prompt.contains("Brazil as of today (2026-02-05)"));
        assert!(prompt.contains("\"fixed_income\""));
    }

    #[test]
    fn explanation_prompt_embeds_profile_and_engine() {
        let input = sample_input(RiskProfile::Moderate);
        let prompt = explanation_prompt(&input, &run_engine(&input)).unwrap();
        assert!(prompt.contains("Amount: 10000 BRL"));
        assert!(prompt.contains("Mid-size bank CDBs (rating A)"));
        assert!(prompt.contains("2000.00 BRL"));
        assert!(!prompt.contains("advanced_analysis"));
    }

    #[test]
    fn detailed_view_requests_advanced_block() {
        let mut input = sample_input(RiskProfile::Aggressive);
        input.view_mode = ViewMode::Detailed;
        let prompt = explanation_prompt(&input, &run_engine(&input)).unwrap();
        assert!(prompt.contains("\"advanced_analysis\""));
    }
}
