use crate::llm::error::MalformedResponse;
use serde_json::Value;

/// Removes a leading ```` ``` ```` / ```` ```json ```` marker and a trailing fence.
pub fn strip_fences(text: &str) -> &str {
    let mut inner = text.trim();
    if let Some(rest) = inner.strip_prefix("```") {
        inner = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = inner.strip_suffix("```") {
        inner = rest;
    }
    inner.trim()
}

/// Best-effort extraction: first '{' to last '}'.
pub fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Turns free-form model output into a JSON object.
///
/// Tries the fence-stripped text as-is, then the outermost brace slice. Never
/// returns an empty object in place of a failure.
pub fn extract_json_value(text: &str) -> Result<Value, MalformedResponse> {
    let cleaned = strip_fences(text);

    let direct_err = match serde_json::from_str::<Value>(cleaned) {
        Ok(v @ Value::Object(_)) => return Ok(v),
        Ok(other) => format!("expected a JSON object, got {}", json_kind(&other)),
        Err(err) => err.to_string(),
    };

    let Some(slice) = brace_slice(cleaned) else {
        return Err(MalformedResponse {
            detail: format!("no JSON object found ({direct_err})"),
        });
    };

    match serde_json::from_str::<Value>(slice) {
        Ok(v @ Value::Object(_)) => Ok(v),
        Ok(other) => Err(MalformedResponse {
            detail: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(err) => Err(MalformedResponse {
            detail: err.to_string(),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_from_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json_value(&fenced).unwrap(), json!({"a": 1}));

        let upper = format!("```JSON\n{body}\n```");
        assert_eq!(extract_json_value(&upper).unwrap(), json!({"a": 1}));

        let bare = format!("```\n{body}\n```");
        assert_eq!(extract_json_value(&bare).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn falls_back_to_braces() {
        let s = "Sure! Here is the plan: {\"a\": {\"b\": [1, 2]}} Let me know.";
        assert_eq!(extract_json_value(s).unwrap(), json!({"a": {"b": [1, 2]}}));
    }

    #[test]
    fn fenced_with_prose_inside_still_parses() {
        let s = "```json\nNote: estimated values\n{\"rate\": 10.5}\n```";
        assert_eq!(extract_json_value(s).unwrap(), json!({"rate": 10.5}));
    }

    #[test]
    fn fails_without_braces() {
        assert!(extract_json_value("I cannot help with that.").is_err());
        assert!(extract_json_value("").is_err());
    }

    #[test]
    fn fails_on_unbalanced_or_reversed_braces() {
        assert!(extract_json_value("{\"a\": 1").is_err());
        assert!(extract_json_value("} nothing here {").is_err());
        assert!(extract_json_value("{\"a\": {\"b\": 1}").is_err());
    }

    #[test]
    fn rejects_bare_scalars_and_arrays() {
        assert!(extract_json_value("42").is_err());
        assert!(extract_json_value("[1, 2, 3]").is_err());
    }

    #[test]
    fn is_deterministic() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json_value(s), extract_json_value(s));
        let bad = "prefix {oops} suffix";
        assert_eq!(extract_json_value(bad), extract_json_value(bad));
    }

    #[test]
    fn error_message_says_json_was_invalid() {
        let err = extract_json_value("no json").unwrap_err();
        assert!(err.to_string().starts_with("model did not return valid JSON"));
    }
}
