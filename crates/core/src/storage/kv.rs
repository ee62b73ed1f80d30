//! JSON documents in a single `kv_entries` table. Writes are last-writer-wins.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Executor, Sqlite};

pub async fn get_json<'e, E, T>(executor: E, key: &str) -> anyhow::Result<Option<T>>
where
    E: Executor<'e, Database = Sqlite>,
    T: DeserializeOwned,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_entries WHERE key = ?1")
        .bind(key)
        .fetch_optional(executor)
        .await
        .with_context(|| format!("select kv_entries failed (key={key})"))?;

    let Some((raw,)) = row else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("stored value is not valid JSON for its type (key={key})"))?;
    Ok(Some(value))
}

pub async fn put_json<'e, E, T>(executor: E, key: &str, value: &T) -> anyhow::Result<()>
where
    E: Executor<'e, Database = Sqlite>,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)
        .with_context(|| format!("failed to encode value (key={key})"))?;

    sqlx::query(
        "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(raw)
    .bind(chrono::Utc::now())
    .execute(executor)
    .await
    .with_context(|| format!("upsert kv_entries failed (key={key})"))?;
    Ok(())
}

/// Returns whether a row was removed.
pub async fn delete<'e, E>(executor: E, key: &str) -> anyhow::Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
        .bind(key)
        .execute(executor)
        .await
        .with_context(|| format!("delete kv_entries failed (key={key})"))?;
    Ok(res.rows_affected() > 0)
}
