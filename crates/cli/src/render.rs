//! Text and JSON output for the terminal.

use reserve_core::advisor::panorama::{Freshness, PanoramaView};
use reserve_core::domain::simulation::Simulation;
use reserve_core::llm::{provider_catalog, ProviderConfig};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn providers(json: bool) -> anyhow::Result<()> {
    let catalog = provider_catalog();
    if json {
        return print_json(&catalog);
    }
    for info in catalog {
        let status = if info.implemented { "" } else { " (not yet implemented)" };
        println!("{} [{}]{status}", info.label, info.id.id());
        for model in info.models {
            println!("  {:<28} {}", model.id, model.description);
        }
    }
    Ok(())
}

pub fn provider_config(config: &ProviderConfig, json: bool) -> anyhow::Result<()> {
    let key = if config.api_key.is_empty() { "not set" } else { "set" };
    if json {
        return print_json(&serde_json::json!({
            "provider": config.provider,
            "model": config.model,
            "temperature": config.temperature,
            "api_key": key,
        }));
    }
    println!("provider:    {}", config.provider);
    println!("model:       {}", config.model);
    println!("temperature: {}", config.temperature);
    println!("api key:     {key}");
    Ok(())
}

pub fn simulation(sim: &Simulation, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(sim);
    }
    let results = &sim.results;
    println!(
        "{}  {} {} ({}, {})",
        sim.id,
        sim.input.amount,
        sim.input.currency,
        sim.input.risk_profile.label(),
        sim.input.horizon.label()
    );
    if !sim.is_real_time {
        println!("[generated locally: the AI answer was unavailable]");
    }
    println!("\n{}\n", results.summary);
    for rec in &results.recommendations {
        println!("{:>6.2}%  {}", rec.allocation_percent, rec.title);
        println!("         {}", rec.rationale);
    }
    if !results.alternatives.is_empty() {
        println!("\nAlternatives:");
        for alt in &results.alternatives {
            println!("  - {}", alt.title);
        }
    }
    if let Some(advanced) = &results.advanced_analysis {
        println!("\nMarket context: {}", advanced.market_context.summary);
        println!(
            "Risk budget: up to {:.2} of {:.2}",
            advanced.risk_budget.max_risk_amount, advanced.risk_budget.total_amount
        );
    }
    println!("\n{}", results.disclaimer);
    Ok(())
}

pub fn history(sims: &[Simulation], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&sims);
    }
    if sims.is_empty() {
        println!("no simulations yet");
    }
    for sim in sims {
        println!(
            "{}  {}  {:>12.2} {}  {}{}",
            sim.id,
            sim.created_at.format("%Y-%m-%d %H:%M"),
            sim.input.amount,
            sim.input.currency,
            sim.input.risk_profile.label(),
            if sim.is_real_time { "" } else { "  (local)" }
        );
    }
    Ok(())
}

pub fn panorama(view: &PanoramaView, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(view);
    }
    if let Freshness::Stale { notice, .. } = &view.freshness {
        println!("[{notice}]");
    }
    let overview = &view.panorama.market_overview;
    println!("{}: {}", view.country, overview.summary);
    if let Some(rate) = overview.interest_rate {
        println!("  interest rate: {rate:.2}%");
    }
    if let Some(inflation) = overview.inflation {
        println!("  inflation:     {inflation:.2}%");
    }

    let sections = &view.panorama.sections;
    if !sections.equities.is_empty() {
        println!("\nEquities");
        for e in &sections.equities {
            println!("  {:<8} {}", e.symbol, e.name);
        }
    }
    if !sections.crypto.is_empty() {
        println!("\nCrypto");
        for c in &sections.crypto {
            println!("  {:<8} {}", c.symbol, c.name);
        }
    }
    for warning in &view.panorama.general_warnings {
        println!("\n! {warning}");
    }
    if !view.sources.is_empty() {
        println!("\nSources:");
        for source in &view.sources {
            println!("  {source}");
        }
    }
    println!("\n{}", view.panorama.disclaimer);
    Ok(())
}
