//! The advisory response pipeline: one provider adapter plus the extraction,
//! retry and fallback policy for each operation.

pub mod fallback;
pub mod panorama;
pub mod prompts;

use crate::advisor::panorama::{normalize_panorama, resolve_panorama, PanoramaFetch, PanoramaView, Tier};
use crate::config::Settings;
use crate::domain::advisory::AdvisoryOutput;
use crate::domain::contract::LlmAdvisoryOutput;
use crate::domain::simulation::Simulation;
use crate::domain::wizard::WizardInput;
use crate::engine::{run_engine, EngineResult};
use crate::llm::dispatch::client_for;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json::extract_json_value;
use crate::llm::retry::{with_retry, RetryPolicy};
use crate::llm::{
    ChatMessage, GenerateRequest, LlmClient, Provider, ProviderConfig, ResponseFormat,
};
use crate::storage::simulations;
use crate::time::market_clock::market_date;
use anyhow::ensure;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::SqlitePool;

const PANORAMA_TEMPERATURE: f32 = 0.1;
const EXPLANATION_TEMPERATURE: f32 = 0.2;

pub struct Advisor {
    client: Box<dyn LlmClient>,
    temperature: f32,
    retry: RetryPolicy,
}

/// Validates `config` and builds the advisor for its provider. Fails before
/// any network traffic on an unsupported provider or a blank key.
pub fn advisor_for(config: &ProviderConfig, settings: &Settings) -> anyhow::Result<Advisor> {
    Ok(Advisor::new(
        client_for(config, settings)?,
        config.temperature,
        settings.retry_policy(),
    ))
}

impl Advisor {
    pub fn new(client: Box<dyn LlmClient>, temperature: f32, retry: RetryPolicy) -> Self {
        Self {
            client,
            temperature,
            retry,
        }
    }

    pub fn provider(&self) -> Provider {
        self.client.provider()
    }

    /// Free-text mentor reply to the full conversation so far.
    pub async fn chat_reply(&self, history: &[ChatMessage]) -> anyhow::Result<String> {
        ensure!(!history.is_empty(), "chat history is empty");

        let request = GenerateRequest {
            system: Some(prompts::CHAT_SYSTEM.to_string()),
            messages: history.to_vec(),
            temperature: self.temperature,
            response_format: ResponseFormat::Text,
            grounding: false,
        };
        let response = with_retry(&self.retry, "chat", || self.client.generate(request.clone())).await?;
        Ok(response.text.trim().to_string())
    }

    /// Grounded attempt first, then one ungrounded attempt. Each tier has its
    /// own retry budget; the second tier only starts after the first gave up.
    pub async fn market_panorama(&self, country: &str, today: NaiveDate) -> anyhow::Result<PanoramaFetch> {
        let prompt = prompts::panorama_prompt(country, today);
        let grounded = self.client.supports_grounding();

        let primary = with_retry(&self.retry, "panorama.grounded", || {
            self.fetch_panorama_json(prompt.clone(), grounded)
        })
        .await;

        let (value, sources, tier) = match primary {
            Ok((value, sources)) => (value, sources, Tier::Grounded),
            Err(err) => {
                tracing::warn!(
                    provider = self.provider().id(),
                    %country,
                    error = %err,
                    "panorama tier 1 failed; retrying without search"
                );
                let prompt = format!("{prompt}\n\n{}", prompts::NO_SEARCH_NOTE);
                let (value, _) = with_retry(&self.retry, "panorama.ungrounded", || {
                    self.fetch_panorama_json(prompt.clone(), false)
                })
                .await?;
                (value, Vec::new(), Tier::Ungrounded)
            }
        };

        tracing::info!(provider = self.provider().id(), %country, ?tier, sources = sources.len(), "panorama fetched");
        Ok(PanoramaFetch {
            panorama: normalize_panorama(country, &value),
            sources,
            tier,
        })
    }

    async fn fetch_panorama_json(&self, prompt: String, grounding: bool) -> anyhow::Result<(Value, Vec<String>)> {
        let request = GenerateRequest {
            grounding,
            ..GenerateRequest::json(prompts::PANORAMA_SYSTEM, prompt, PANORAMA_TEMPERATURE)
        };
        let response = self.client.generate(request).await?;
        let value = extract_json_value(&response.text)?;
        Ok((value, response.grounding_queries))
    }

    /// Model explanation of the engine's plan. An unusable answer is replaced
    /// by the local synthesis; provider errors still propagate.
    pub async fn explain_allocation(
        &self,
        input: &WizardInput,
        engine: &EngineResult,
    ) -> anyhow::Result<AdvisoryOutput> {
        let request = GenerateRequest::json(
            prompts::ADVISORY_SYSTEM,
            prompts::explanation_prompt(input, engine)?,
            EXPLANATION_TEMPERATURE,
        );

        let text = match with_retry(&self.retry, "explanation", || self.client.generate(request.clone())).await {
            Ok(response) => response.text,
            Err(err) if is_empty_response(&err) => String::new(),
            Err(err) => return Err(err),
        };
        tracing::debug!(provider = self.provider().id(), text_len = text.len(), "explanation received");

        let parsed = extract_json_value(&text)
            .map_err(anyhow::Error::from)
            .and_then(LlmAdvisoryOutput::from_value)
            .and_then(LlmAdvisoryOutput::validate_and_into_output);

        match parsed {
            Ok(output) => Ok(output),
            Err(err) => {
                tracing::warn!(
                    provider = self.provider().id(),
                    error = %err,
                    "explanation unusable; using local synthesis"
                );
                Ok(fallback::synthesize(input, engine))
            }
        }
    }
}

fn is_empty_response(err: &anyhow::Error) -> bool {
    err.downcast_ref::<LlmDiagnosticsError>()
        .is_some_and(|d| d.stage == "empty_response")
}

/// Runs one wizard submission end to end and stores it in the history.
pub async fn run_simulation(
    advisor: &Advisor,
    pool: &SqlitePool,
    input: WizardInput,
    now: DateTime<Utc>,
) -> anyhow::Result<Simulation> {
    input.validate()?;
    let engine = run_engine(&input);
    let results = advisor.explain_allocation(&input, &engine).await?;
    let simulation = Simulation::new(input, results, now);
    simulations::save(pool, &simulation).await?;

    tracing::info!(
        id = %simulation.id,
        provider = advisor.provider().id(),
        real_time = simulation.is_real_time,
        "simulation completed"
    );
    Ok(simulation)
}

/// Panorama for `country` through the degradation chain and the cache.
pub async fn panorama_for(
    advisor: &Advisor,
    pool: &SqlitePool,
    country: &str,
    now: DateTime<Utc>,
    max_age: Option<chrono::Duration>,
) -> anyhow::Result<PanoramaView> {
    let today = market_date(country, now)?;
    resolve_panorama(
        pool,
        country,
        advisor.provider(),
        advisor.market_panorama(country, today),
        now,
        max_age,
    )
    .await
}
