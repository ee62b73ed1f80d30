use crate::market::{resolve_country, Country};
use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

// Fixed offsets; daylight saving is ignored, which only matters around midnight.
const BRAZIL_OFFSET_SECS: i32 = -3 * 3600;
const US_EASTERN_OFFSET_SECS: i32 = -5 * 3600;

pub fn utc_offset_secs(country: &str) -> i32 {
    match resolve_country(country) {
        Some(Country::Brazil) => BRAZIL_OFFSET_SECS,
        Some(Country::UnitedStates) => US_EASTERN_OFFSET_SECS,
        None => 0,
    }
}

/// Local calendar date of the country's main market at `now_utc`.
pub fn market_date(country: &str, now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let secs = utc_offset_secs(country);
    let offset = FixedOffset::east_opt(secs)
        .with_context(|| format!("invalid UTC offset for {country}: {secs}s"))?;
    Ok(now_utc.with_timezone(&offset).date_naive())
}
