use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use reserve_core::advisor::panorama::{PanoramaUnavailable, PanoramaView};
use reserve_core::advisor::{advisor_for, panorama_for, run_simulation};
use reserve_core::config::Settings;
use reserve_core::domain::simulation::Simulation;
use reserve_core::domain::wizard::WizardInput;
use reserve_core::llm::error::{categorize, user_message, ErrorCategory};
use reserve_core::llm::{provider_catalog, ChatMessage, Provider, ProviderConfig, ProviderInfo};
use reserve_core::storage::preferences::{self, ExperienceLevel};
use reserve_core::storage::simulations;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool = match reserve_core::storage::connect(&settings.database_url).await {
        Ok(pool) => match reserve_core::storage::migrate(&pool).await {
            Ok(()) => Some(pool),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "db connect failed; starting API in degraded mode");
            None
        }
    };

    let state = AppState {
        pool,
        settings: Arc::new(settings),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/providers", get(list_providers))
        .route(
            "/preferences/ai-config",
            get(get_ai_config).put(put_ai_config),
        )
        .route(
            "/preferences/experience-level",
            get(get_experience_level).put(put_experience_level),
        )
        .route("/simulations", post(create_simulation).get(list_simulations))
        .route(
            "/simulations/:id",
            get(get_simulation).delete(delete_simulation),
        )
        .route("/panorama/:country", get(get_panorama))
        .route("/chat", post(chat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<SqlitePool>,
    settings: Arc<Settings>,
}

impl AppState {
    fn pool(&self) -> Result<&SqlitePool, ApiError> {
        self.pool.as_ref().ok_or_else(|| ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            category: "unavailable",
            message: "storage is not available".to_string(),
        })
    }

    /// Request override first, then the stored config, then an empty default
    /// that fails validation with a missing-key error.
    async fn provider_config(&self, requested: Option<ProviderConfig>) -> Result<ProviderConfig, ApiError> {
        if let Some(config) = requested {
            return Ok(config.normalized());
        }
        let stored = preferences::load_ai_config(self.pool()?)
            .await
            .map_err(ApiError::internal)?;
        Ok(stored.unwrap_or_default())
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    category: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody<'a> {
    category: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            category: self.category,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl ApiError {
    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "internal error");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            category: "internal",
            message: format!("{err:#}"),
        }
    }

    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            category: "not_found",
            message: format!("{what} not found"),
        }
    }

    fn bad_request(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            category: "invalid_input",
            message: format!("{err:#}"),
        }
    }

    /// Maps an error that escaped the pipeline's fallbacks to a categorized response.
    fn from_pipeline(err: anyhow::Error, provider: Provider) -> Self {
        let category = categorize(&err);
        let unavailable = err.downcast_ref::<PanoramaUnavailable>();
        let status = match (category, unavailable) {
            (ErrorCategory::Configuration, _) => StatusCode::BAD_REQUEST,
            (ErrorCategory::QuotaExceeded, _) => StatusCode::TOO_MANY_REQUESTS,
            (_, Some(_)) => StatusCode::SERVICE_UNAVAILABLE,
            (ErrorCategory::ModelNotFound | ErrorCategory::Provider, None) => StatusCode::BAD_GATEWAY,
        };
        if category != ErrorCategory::Configuration {
            sentry_anyhow::capture_anyhow(&err);
        }

        let message = match unavailable {
            Some(unavailable) => unavailable.to_string(),
            None => user_message(&err, Some(provider)),
        };
        tracing::warn!(provider = provider.id(), category = category.as_str(), error = %err, "pipeline error");
        Self {
            status,
            category: category.as_str(),
            message,
        }
    }
}

async fn list_providers() -> Json<Vec<ProviderInfo>> {
    Json(provider_catalog())
}

/// Provider config as shown to clients: the key itself never leaves the store.
#[derive(Debug, Serialize)]
struct MaskedAiConfig {
    provider: Provider,
    model: String,
    temperature: f32,
    has_api_key: bool,
    api_key_hint: Option<String>,
}

impl From<&ProviderConfig> for MaskedAiConfig {
    fn from(config: &ProviderConfig) -> Self {
        let key = config.api_key.trim();
        let len = key.chars().count();
        let hint = (len > 4).then(|| {
            let tail: String = key.chars().skip(len - 4).collect();
            format!("****{tail}")
        });
        Self {
            provider: config.provider,
            model: config.model.clone(),
            temperature: config.temperature,
            has_api_key: !key.is_empty(),
            api_key_hint: hint,
        }
    }
}

async fn get_ai_config(State(state): State<AppState>) -> Result<Json<MaskedAiConfig>, ApiError> {
    let config = state.provider_config(None).await?;
    Ok(Json(MaskedAiConfig::from(&config)))
}

async fn put_ai_config(
    State(state): State<AppState>,
    Json(config): Json<ProviderConfig>,
) -> Result<Json<MaskedAiConfig>, ApiError> {
    if !config.provider.is_implemented() {
        return Err(ApiError::bad_request(anyhow::anyhow!(
            "{} not yet implemented",
            config.provider
        )));
    }
    let config = config.normalized();
    preferences::store_ai_config(state.pool()?, &config)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(MaskedAiConfig::from(&config)))
}

#[derive(Debug, Serialize, Deserialize)]
struct ExperienceLevelBody {
    level: ExperienceLevel,
}

async fn get_experience_level(
    State(state): State<AppState>,
) -> Result<Json<ExperienceLevelBody>, ApiError> {
    let level = preferences::load_experience_level(state.pool()?)
        .await
        .map_err(ApiError::internal)?
        .unwrap_or_default();
    Ok(Json(ExperienceLevelBody { level }))
}

async fn put_experience_level(
    State(state): State<AppState>,
    Json(body): Json<ExperienceLevelBody>,
) -> Result<Json<ExperienceLevelBody>, ApiError> {
    preferences::store_experience_level(state.pool()?, body.level)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
struct CreateSimulationRequest {
    #[serde(flatten)]
    input: WizardInput,
    #[serde(default)]
    ai_config: Option<ProviderConfig>,
}

async fn create_simulation(
    State(state): State<AppState>,
    Json(req): Json<CreateSimulationRequest>,
) -> Result<(StatusCode, Json<Simulation>), ApiError> {
    req.input.validate().map_err(ApiError::bad_request)?;
    let pool = state.pool()?;
    let config = state.provider_config(req.ai_config).await?;
    let advisor = advisor_for(&config, &state.settings)
        .map_err(|e| ApiError::from_pipeline(e, config.provider))?;

    let simulation = run_simulation(&advisor, pool, req.input, chrono::Utc::now())
        .await
        .map_err(|e| ApiError::from_pipeline(e, config.provider))?;
    Ok((StatusCode::CREATED, Json(simulation)))
}

async fn list_simulations(State(state): State<AppState>) -> Result<Json<Vec<Simulation>>, ApiError> {
    let all = simulations::list(state.pool()?)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(all))
}

async fn get_simulation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Simulation>, ApiError> {
    simulations::get_by_id(state.pool()?, id)
        .await
        .map_err(ApiError::internal)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("simulation"))
}

async fn delete_simulation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = simulations::delete(state.pool()?, id)
        .await
        .map_err(ApiError::internal)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("simulation"))
    }
}

async fn get_panorama(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<PanoramaView>, ApiError> {
    let pool = state.pool()?;
    let config = state.provider_config(None).await?;
    let advisor = advisor_for(&config, &state.settings)
        .map_err(|e| ApiError::from_pipeline(e, config.provider))?;

    let view = panorama_for(
        &advisor,
        pool,
        &country,
        chrono::Utc::now(),
        state.settings.panorama_cache_max_age(),
    )
    .await
    .map_err(|e| ApiError::from_pipeline(e, config.provider))?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    ai_config: Option<ProviderConfig>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.messages.is_empty() {
        return Err(ApiError::bad_request(anyhow::anyhow!("messages must not be empty")));
    }
    let config = state.provider_config(req.ai_config).await?;
    let advisor = advisor_for(&config, &state.settings)
        .map_err(|e| ApiError::from_pipeline(e, config.provider))?;

    let reply = advisor
        .chat_reply(&req.messages)
        .await
        .map_err(|e| ApiError::from_pipeline(e, config.provider))?;
    Ok(Json(ChatResponse { reply }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reserve_core::llm::error::ConfigError;

    #[test]
    fn masked_config_hides_the_key() {
        let config = ProviderConfig {
            api_key: "sk-abcdef1234".to_string(),
            ..ProviderConfig::default()
        };
        let masked = serde_json::to_value(MaskedAiConfig::from(&config)).unwrap();
        assert_eq!(masked["api_key_hint"], "****1234");
        assert_eq!(masked["has_api_key"], true);
        assert!(!masked.to_string().contains("sk-abcdef"));
    }

    #[test]
    fn config_errors_map_to_bad_request() {
        let err: anyhow::Error = ConfigError::MissingApiKey {
            provider: Provider::Gemini,
        }
        .into();
        let api = ApiError::from_pipeline(err, Provider::Gemini);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.category, "configuration");
    }

    #[test]
    fn exhausted_panorama_chain_is_service_unavailable() {
        let err = anyhow::anyhow!("connection reset").context(PanoramaUnavailable {
            provider: Provider::OpenAi,
            detail: "connection reset".to_string(),
        });
        let api = ApiError::from_pipeline(err, Provider::OpenAi);
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(api.message.starts_with("could not load the market panorama"));
    }

    #[test]
    fn quota_errors_map_to_too_many_requests() {
        let api = ApiError::from_pipeline(
            anyhow::anyhow!("RESOURCE_EXHAUSTED: quota"),
            Provider::Gemini,
        );
        assert_eq!(api.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(api.message.contains("Google AI Studio (Gemini)"));
    }
}
