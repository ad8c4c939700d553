// mandi/src/config.rs

use crate::error::{MandiError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ALL_LOCATIONS: &str = "All India";

/// Tunables for discovery and session behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MandiConfig {
  /// Location label meaning "no city filter".
  pub all_locations: String,
  pub featured_limit: usize,
  pub category_limit: usize,
  pub trending_news_limit: usize,
  /// How long a comparison rejection stays visible.
  pub notice_ttl: Duration,
  /// Upper bound on a single discovery fetch. `None` leaves timing to the store client.
  pub store_timeout: Option<Duration>,
}

impl Default for MandiConfig {
  fn default() -> Self {
    Self {
      all_locations: DEFAULT_ALL_LOCATIONS.to_string(),
      featured_limit: 8,
      category_limit: 10,
      trending_news_limit: 3,
      notice_ttl: Duration::from_millis(4000),
      store_timeout: None,
    }
  }
}

impl MandiConfig {
  /// Reads `MANDI_*` variables (after loading a `.env` file if present). Every
  /// variable is optional; unset ones keep their default.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let defaults = Self::default();

    let parse = |key: &str| -> Result<Option<u64>> {
      lookup(key)
        .map(|raw| parse_value::<u64>(key, &raw))
        .transpose()
    };

    let all_locations = lookup("MANDI_ALL_LOCATIONS")
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
      .unwrap_or(defaults.all_locations);
    let featured_limit = parse("MANDI_FEATURED_LIMIT")?.map_or(defaults.featured_limit, |v| v as usize);
    let category_limit = parse("MANDI_CATEGORY_LIMIT")?.map_or(defaults.category_limit, |v| v as usize);
    let trending_news_limit =
      parse("MANDI_TRENDING_NEWS_LIMIT")?.map_or(defaults.trending_news_limit, |v| v as usize);
    let notice_ttl = parse("MANDI_NOTICE_TTL_MS")?.map_or(defaults.notice_ttl, Duration::from_millis);
    let store_timeout = parse("MANDI_STORE_TIMEOUT_MS")?.map(Duration::from_millis);

    tracing::debug!(
      %all_locations,
      featured_limit,
      category_limit,
      notice_ttl_ms = notice_ttl.as_millis() as u64,
      "Configuration loaded."
    );

    Ok(Self {
      all_locations,
      featured_limit,
      category_limit,
      trending_news_limit,
      notice_ttl,
      store_timeout,
    })
  }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| MandiError::Validation(format!("Invalid {} value '{}': {}", key, raw, e)))
}
