use crate::domain::simulation::Simulation;
use crate::storage::kv;
use anyhow::Context;
use sqlx::SqlitePool;
use uuid::Uuid;

pub const SIMULATIONS_KEY: &str = "reserve_advisor:simulations";

/// Newest first.
pub async fn list(pool: &SqlitePool) -> anyhow::Result<Vec<Simulation>> {
    let all: Option<Vec<Simulation>> = kv::get_json(pool, SIMULATIONS_KEY).await?;
    Ok(all.unwrap_or_default())
}

/// Inserts at the front of the history. Saving an id that already exists replaces it.
pub async fn save(pool: &SqlitePool, simulation: &Simulation) -> anyhow::Result<()> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let mut all: Vec<Simulation> = kv::get_json(&mut *tx, SIMULATIONS_KEY)
        .await?
        .unwrap_or_default();
    all.retain(|s| s.id != simulation.id);
    all.insert(0, simulation.clone());
    kv::put_json(&mut *tx, SIMULATIONS_KEY, &all).await?;

    tx.commit().await.context("commit transaction failed")?;
    tracing::debug!(id = %simulation.id, total = all.len(), "simulation saved");
    Ok(())
}

pub async fn get_by_id(pool: &SqlitePool, id: Uuid) -> anyhow::Result<Option<Simulation>> {
    Ok(list(pool).await?.into_iter().find(|s| s.id == id))
}

/// Returns whether a simulation with `id` existed.
pub async fn delete(pool: &SqlitePool, id: Uuid) -> anyhow::Result<bool> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let mut all: Vec<Simulation> = kv::get_json(&mut *tx, SIMULATIONS_KEY)
        .await?
        .unwrap_or_default();
    let before = all.len();
    all.retain(|s| s.id != id);
    let removed = all.len() != before;
    if removed {
        kv::put_json(&mut *tx, SIMULATIONS_KEY, &all).await?;
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(removed)
}
