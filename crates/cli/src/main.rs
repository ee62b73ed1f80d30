use anyhow::Context;
use clap::{Parser, Subcommand};
use reserve_core::advisor::{advisor_for, panorama_for, run_simulation};
use reserve_core::config::Settings;
use reserve_core::domain::wizard::{Horizon, Objective, RiskProfile, ViewMode, WizardInput};
use reserve_core::domain::Level;
use reserve_core::llm::error::{categorize, user_message, ErrorCategory};
use reserve_core::llm::{ChatMessage, Provider, ProviderConfig};
use reserve_core::storage::{preferences, simulations};
use sqlx::SqlitePool;
use std::io::Write;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod render;

#[derive(Debug, Parser)]
#[command(name = "reserve", about = "Educational reserve planning from the terminal")]
struct Args {
    /// Print raw JSON instead of the text report.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List supported AI providers and their models.
    Providers,
    /// Show or change the stored provider configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run the wizard non-interactively and store the simulation.
    Simulate(SimulateArgs),
    /// Market panorama for a country.
    Panorama {
        #[arg(long, default_value = "Brazil")]
        country: String,
    },
    /// Chat with the mentor. Reads one message per line from stdin.
    Chat,
    /// Stored simulations, newest first.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        provider: Option<Provider>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum HistoryAction {
    List,
    Show { id: Uuid },
    Delete { id: Uuid },
}

#[derive(Debug, Clone, clap::Args)]
struct SimulateArgs {
    #[arg(long)]
    amount: f64,
    #[arg(long, default_value = "BRL")]
    currency: String,
    #[arg(long, default_value = "Brazil")]
    country: String,
    /// Repeatable, e.g. `--objective emergency-reserve --objective travel`.
    #[arg(long = "objective", required = true)]
    objectives: Vec<Objective>,
    #[arg(long)]
    other_objective: Option<String>,
    #[arg(long)]
    horizon: Horizon,
    #[arg(long)]
    risk: RiskProfile,
    #[arg(long, default_value = "medium")]
    volatility: Level,
    #[arg(long)]
    daily_liquidity: bool,
    #[arg(long)]
    prefers_protection: bool,
    #[arg(long)]
    accepts_oscillation: bool,
    /// Ask for the advanced analysis block.
    #[arg(long)]
    detailed: bool,
}

impl From<SimulateArgs> for WizardInput {
    fn from(args: SimulateArgs) -> Self {
        WizardInput {
            amount: args.amount,
            currency: args.currency,
            country: args.country,
            objectives: args.objectives,
            other_objective_detail: args.other_objective,
            horizon: args.horizon,
            risk_profile: args.risk,
            volatility_tolerance: args.volatility,
            daily_liquidity: args.daily_liquidity,
            prefers_protection: args.prefers_protection,
            accepts_oscillation: args.accepts_oscillation,
            view_mode: if args.detailed {
                ViewMode::Detailed
            } else {
                ViewMode::Simple
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Command::Providers = args.command {
        return render::providers(args.json);
    }

    let pool = reserve_core::storage::connect(&settings.database_url).await?;
    reserve_core::storage::migrate(&pool).await?;

    let result = run(&args, &settings, &pool).await;
    if let Err(err) = &result {
        if categorize(err) != ErrorCategory::Configuration {
            sentry_anyhow::capture_anyhow(err);
        }
    }
    result
}

async fn run(args: &Args, settings: &Settings, pool: &SqlitePool) -> anyhow::Result<()> {
    match &args.command {
        Command::Providers => render::providers(args.json),
        Command::Config { action } => config(action, pool, args.json).await,
        Command::Simulate(sim) => {
            let config = provider_config(settings, pool).await?;
            let advisor = advisor_for(&config, settings)?;
            let input = WizardInput::from(sim.clone());
            let simulation = run_simulation(&advisor, pool, input, chrono::Utc::now())
                .await
                .map_err(|e| surface(e, config.provider))?;
            render::simulation(&simulation, args.json)
        }
        Command::Panorama { country } => {
            let config = provider_config(settings, pool).await?;
            let advisor = advisor_for(&config, settings)?;
            let view = panorama_for(
                &advisor,
                pool,
                country,
                chrono::Utc::now(),
                settings.panorama_cache_max_age(),
            )
            .await
            .map_err(|e| surface(e, config.provider))?;
            render::panorama(&view, args.json)
        }
        Command::Chat => {
            let config = provider_config(settings, pool).await?;
            let advisor = advisor_for(&config, settings)?;
            chat_loop(&advisor, config.provider).await
        }
        Command::History { action } => history(action, pool, args.json).await,
    }
}

/// `AI_*` environment variables win over the stored config.
async fn provider_config(settings: &Settings, pool: &SqlitePool) -> anyhow::Result<ProviderConfig> {
    if let Some(config) = settings.provider_config_from_env()? {
        return Ok(config);
    }
    Ok(preferences::load_ai_config(pool).await?.unwrap_or_default())
}

/// Keeps the full chain for the log and puts the user-facing message on top.
fn surface(err: anyhow::Error, provider: Provider) -> anyhow::Error {
    tracing::debug!(error = ?err, "pipeline error");
    let message = user_message(&err, Some(provider));
    err.context(message)
}

async fn config(action: &ConfigAction, pool: &SqlitePool, json: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = preferences::load_ai_config(pool).await?.unwrap_or_default();
            render::provider_config(&config, json)
        }
        ConfigAction::Set {
            provider,
            model,
            temperature,
            api_key,
        } => {
            let mut config = preferences::load_ai_config(pool).await?.unwrap_or_default();
            if let Some(provider) = provider {
                anyhow::ensure!(provider.is_implemented(), "{provider} not yet implemented");
                config = config.with_provider(*provider);
            }
            if let Some(model) = model {
                config.model = model.clone();
            }
            if let Some(temperature) = temperature {
                config.temperature = *temperature;
            }
            if let Some(api_key) = api_key {
                config.api_key = api_key.clone();
            }
            let config = config.normalized();
            preferences::store_ai_config(pool, &config).await?;
            render::provider_config(&config, json)
        }
    }
}

async fn history(action: &HistoryAction, pool: &SqlitePool, json: bool) -> anyhow::Result<()> {
    match action {
        HistoryAction::List => render::history(&simulations::list(pool).await?, json),
        HistoryAction::Show { id } => {
            let simulation = simulations::get_by_id(pool, *id)
                .await?
                .with_context(|| format!("no simulation with id {id}"))?;
            render::simulation(&simulation, json)
        }
        HistoryAction::Delete { id } => {
            anyhow::ensure!(
                simulations::delete(pool, *id).await?,
                "no simulation with id {id}"
            );
            println!("deleted {id}");
            Ok(())
        }
    }
}

async fn chat_loop(advisor: &reserve_core::advisor::Advisor, provider: Provider) -> anyhow::Result<()> {
    let mut history: Vec<ChatMessage> = Vec::new();
    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/quit" {
            return Ok(());
        }

        history.push(ChatMessage::user(text));
        match advisor.chat_reply(&history).await {
            Ok(reply) => {
                println!("{reply}\n");
                history.push(ChatMessage::model(reply));
            }
            Err(err) => {
                // Drop the unanswered turn so the next message can be retried.
                history.pop();
                tracing::warn!(error = %err, "chat reply failed");
                eprintln!("error: {}", user_message(&err, Some(provider)));
            }
        }
    }
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

    #[test]
    fn parses_simulate_flags_into_wizard_input() {
        let args = Args::try_parse_from([
            "reserve",
            "simulate",
            "--amount",
            "5000",
            "--objective",
            "emergency-reserve",
            "--objective",
            "travel",
            "--horizon",
            "short-term",
            "--risk",
            "conservative",
            "--daily-liquidity",
            "--detailed",
        ])
        .unwrap();
        let Command::Simulate(sim) = args.command else {
            panic!("expected simulate");
        };
        let input = WizardInput::from(sim);
        assert_eq!(input.objectives, vec![Objective::EmergencyReserve, Objective::Travel]);
        assert_eq!(input.horizon, Horizon::ShortTerm);
        assert_eq!(input.risk_profile, RiskProfile::Conservative);
        assert_eq!(input.view_mode, ViewMode::Detailed);
        assert_eq!(input.country, "Brazil");
        assert!(input.daily_liquidity);
        input.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = Args::try_parse_from(["reserve", "config", "set", "--provider", "mistral"]);
        assert!(err.is_err());
    }

    #[test]
    fn history_show_requires_a_uuid() {
        assert!(Args::try_parse_from(["reserve", "history", "show", "not-a-uuid"]).is_err());
        let id = Uuid::new_v4().to_string();
        assert!(Args::try_parse_from(["reserve", "history", "show", &id]).is_ok());
    }
}
