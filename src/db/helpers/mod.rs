use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Parse a nullable text column into an enum.
pub fn parse_optional<T>(value: Option<String>, field: &str) -> Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    match value {
        Some(raw) => raw
            .parse()
            .map(Some)
            .with_context(|| format!("failed to parse {field}")),
        None => Ok(None),
    }
}
