use crate::llm::error::{ConfigError, LlmDiagnosticsError, MalformedResponse};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `attempt` (1-based): attempt² × base.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_mul(attempt))
    }
}

/// Rate limits, 5xx responses, timeouts and connection failures.
///
/// Typed errors in the chain decide first. Unparseable model output and bad
/// configuration never retry, whatever digits their messages carry. Plain
/// message errors fall back to matching status tokens.
pub fn is_transient(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if cause.is::<MalformedResponse>() || cause.is::<ConfigError>() || cause.is::<serde_json::Error>() {
            return false;
        }
        if let Some(diag) = cause.downcast_ref::<LlmDiagnosticsError>() {
            return diag.status.is_some_and(is_transient_status);
        }
        if let Some(http) = cause.downcast_ref::<reqwest::Error>() {
            return http.is_timeout()
                || http.is_connect()
                || http.status().is_some_and(|s| is_transient_status(s.as_u16()));
        }
    }

    let message = format!("{err:#}").to_lowercase();
    message.contains("resource_exhausted")
        || message
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter_map(|token| token.parse::<u16>().ok())
            .any(is_transient_status)
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// attempt budget is spent. Attempts are strictly sequential; the last error
/// is returned unchanged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_transient(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                let backoff = policy.delay_for(attempt);
                tracing::warn!(
                    label,
                    attempt,
                    ?backoff,
                    error = %err,
                    "transient provider error; retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
