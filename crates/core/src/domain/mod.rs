pub mod advisory;
pub mod contract;
pub mod panorama;
pub mod simulation;
pub mod wizard;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Three-step qualitative scale used for volatility, liquidity and data quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl std::str::FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tag(s, "level")
    }
}

/// Parses a user-typed tag ("daily-liquidity", "Long term") into a
/// SCREAMING_SNAKE_CASE serde enum.
pub(crate) fn parse_tag<T: DeserializeOwned>(s: &str, what: &str) -> anyhow::Result<T> {
    let tag = s.trim().replace(['-', ' '], "_").to_uppercase();
    serde_json::from_value(serde_json::Value::String(tag))
        .map_err(|_| anyhow::anyhow!("unknown {what}: {s}"))
}

/// Tag parsing for model-supplied JSON: "Medium", "high" and "fixed income"
/// all resolve. Non-strings and unknown tags give `None`.
pub(crate) fn tag_from_value<T: DeserializeOwned>(v: Value) -> Option<T> {
    match v {
        Value::String(s) => parse_tag(&s, "tag").ok(),
        _ => None,
    }
}

/// `deserialize_with` for enum fields that fall back to their default.
pub(crate) fn lenient_tag<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(tag_from_value(Value::deserialize(d)?).unwrap_or_default())
}

/// `deserialize_with` for required enum fields.
pub(crate) fn required_tag<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(d)?;
    let shown = v.to_string();
    tag_from_value(v).ok_or_else(|| serde::de::Error::custom(format!("unknown tag {shown}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_ignore_case_and_separators() {
        assert_eq!(tag_from_value::<Level>(Value::from("Medium")), Some(Level::Medium));
        assert_eq!(tag_from_value::<Level>(Value::from(" high ")), Some(Level::High));
        assert_eq!(tag_from_value::<Level>(Value::from("extreme")), None);
        assert_eq!(tag_from_value::<Level>(Value::from(3)), None);
    }
}
