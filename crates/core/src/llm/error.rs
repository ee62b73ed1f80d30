use crate::llm::Provider;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, stage={}): {}",
            self.provider.id(),
            self.stage,
            self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

impl LlmDiagnosticsError {
    /// Builds an `http` stage error from a non-success response, pulling the
    /// provider's own error message and code out of the body when present.
    pub fn from_http(provider: Provider, status: reqwest::StatusCode, body: String) -> Self {
        let mut detail = format!("status={status}");
        if let Ok(v) = serde_json::from_str::<Value>(&body) {
            let err = v.get("error").unwrap_or(&v);
            let code = err
                .get("status")
                .or_else(|| err.get("type"))
                .or_else(|| err.get("code"))
                .and_then(value_as_text);
            let message = err.get("message").and_then(Value::as_str);
            if let Some(code) = code {
                detail.push_str(&format!(", code={code}"));
            }
            if let Some(message) = message {
                detail.push_str(&format!(": {message}"));
            }
        }

        Self {
            provider,
            stage: "http",
            status: Some(status.as_u16()),
            detail,
            raw_output: Some(body),
        }
    }

    pub fn empty_response(provider: Provider, raw_output: Option<String>) -> Self {
        Self {
            provider,
            stage: "empty_response",
            status: None,
            detail: "the model returned an empty response".to_string(),
            raw_output,
        }
    }
}

fn value_as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Problems with the caller-supplied configuration. Raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiKey { provider: Provider },
    UnsupportedProvider(Provider),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingApiKey { provider } => write!(
                f,
                "no API key configured for {provider}; set one before generating a diagnostic"
            ),
            ConfigError::UnsupportedProvider(provider) => {
                write!(f, "{provider} not yet implemented")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// The model's text could not be turned into a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedResponse {
    pub detail: String,
}

impl fmt::Display for MalformedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model did not return valid JSON: {}", self.detail)
    }
}

impl std::error::Error for MalformedResponse {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    QuotaExceeded,
    ModelNotFound,
    Provider,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::QuotaExceeded => "quota_exceeded",
            ErrorCategory::ModelNotFound => "model_not_found",
            ErrorCategory::Provider => "provider",
        }
    }
}

pub fn categorize(err: &anyhow::Error) -> ErrorCategory {
    if err.downcast_ref::<ConfigError>().is_some() {
        return ErrorCategory::Configuration;
    }

    let message = format!("{err:#}");
    let lower = message.to_lowercase();
    let (status, code) = status_and_code(err, &message);

    if status == Some(429)
        || code.as_deref() == Some("RESOURCE_EXHAUSTED")
        || lower.contains("resource_exhausted")
        || lower.contains("quota")
    {
        return ErrorCategory::QuotaExceeded;
    }
    if status == Some(404) || lower.contains("not found") {
        return ErrorCategory::ModelNotFound;
    }
    ErrorCategory::Provider
}

/// Human-readable message for an error that escaped every fallback.
pub fn user_message(err: &anyhow::Error, provider: Option<Provider>) -> String {
    let provider_label = provider.map(|p| p.label()).unwrap_or("the AI provider");
    match categorize(err) {
        ErrorCategory::Configuration => err.to_string(),
        ErrorCategory::QuotaExceeded => format!(
            "API usage limit reached. Check quotas/billing for {provider_label} or wait and try again."
        ),
        ErrorCategory::ModelNotFound => "Model not found at the provider. Confirm the selected model \
             (e.g. gemini-2.5-flash) and that it is enabled for your key."
            .to_string(),
        ErrorCategory::Provider => match err.downcast_ref::<LlmDiagnosticsError>() {
            Some(diag) => diag.detail.clone(),
            None => format!("{err:#}"),
        },
    }
}

/// Status and code from a typed provider error, or from a JSON error object
/// embedded in the message text.
fn status_and_code(err: &anyhow::Error, message: &str) -> (Option<u16>, Option<String>) {
    if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
        let code = diag
            .raw_output
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .and_then(|v| embedded_code(&v));
        return (diag.status, code);
    }

    let Some(start) = message.find('{') else {
        return (None, None);
    };
    let Ok(v) = serde_json::from_str::<Value>(&message[start..]) else {
        return (None, None);
    };
    let err_obj = v.get("error").unwrap_or(&v);
    let status = err_obj
        .get("code")
        .or_else(|| err_obj.get("status"))
        .and_then(Value::as_u64)
        .and_then(|n| u16::try_from(n).ok());
    (status, embedded_code(&v))
}

fn embedded_code(v: &Value) -> Option<String> {
    let err_obj = v.get("error").unwrap_or(v);
    err_obj
        .get("status")
        .or_else(|| err_obj.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn gemini_quota_error() -> anyhow::Error {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded for metric","status":"RESOURCE_EXHAUSTED"}}"#;
        LlmDiagnosticsError::from_http(Provider::Gemini, StatusCode::TOO_MANY_REQUESTS, body.to_string())
            .into()
    }

    #[test]
    fn http_error_detail_carries_status_and_provider_code() {
        let err = gemini_quota_error();
        let text = format!("{err:#}");
        assert!(text.contains("429"));
        assert!(text.contains("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn categorizes_quota_errors() {
        assert_eq!(categorize(&gemini_quota_error()), ErrorCategory::QuotaExceeded);
        assert_eq!(
            categorize(&anyhow::anyhow!("You exceeded your current quota")),
            ErrorCategory::QuotaExceeded
        );
        let msg = user_message(&gemini_quota_error(), Some(Provider::Gemini));
        assert!(msg.contains("Google AI Studio (Gemini)"));
    }

    #[test]
    fn categorizes_missing_models() {
        let err: anyhow::Error = LlmDiagnosticsError::from_http(
            Provider::OpenAi,
            StatusCode::NOT_FOUND,
            r#"{"error":{"message":"The model `gpt-9` does not exist","type":"invalid_request_error"}}"#
                .to_string(),
        )
        .into();
        assert_eq!(categorize(&err), ErrorCategory::ModelNotFound);
        assert_eq!(
            categorize(&anyhow::anyhow!("models/foo is not found for API version v1beta")),
            ErrorCategory::ModelNotFound
        );
    }

    #[test]
    fn reads_status_from_embedded_json_message() {
        let err = anyhow::Error::msg(r#"request failed {"error":{"code":404,"message":"nope"}}"#);
        assert_eq!(categorize(&err), ErrorCategory::ModelNotFound);
    }

    #[test]
    fn other_errors_show_raw_message() {
        let err: anyhow::Error = LlmDiagnosticsError::from_http(
            Provider::OpenAi,
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key provided"}}"#.to_string(),
        )
        .into();
        assert_eq!(categorize(&err), ErrorCategory::Provider);
        assert_eq!(
            user_message(&err, Some(Provider::OpenAi)),
            "status=401 Unauthorized: Incorrect API key provided"
        );
    }

    #[test]
    fn config_errors_are_their_own_category() {
        let err: anyhow::Error = ConfigError::UnsupportedProvider(Provider::Groq).into();
        assert_eq!(categorize(&err), ErrorCategory::Configuration);
        assert_eq!(user_message(&err, None), "Groq not yet implemented");
    }
}
