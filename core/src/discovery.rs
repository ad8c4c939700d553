// mandi/src/discovery.rs

//! The public product feed.
//!
//! One coarse store fetch (approved listings, optionally featured only) followed by
//! in-memory refinement: visibility, category, city, free text, recency ordering and
//! truncation. Category and city are filtered here rather than in the store query so
//! the store needs no composite indexes.
//!
//! Each refinement is a named stage of a [`Pipeline`]; stages whose filter is unset
//! are skipped by condition.

use crate::config::MandiConfig;
use crate::core::{ContextData, StageControl, StageDef};
use crate::error::{MandiError, Result};
use crate::model::{Category, ModerationStatus, NewsItem, Product};
use crate::pipeline::Pipeline;
use crate::store::{decode_lenient, within, Collection, Query, RecordStore};
use crate::visibility::is_publicly_visible;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const STAGE_FETCH: &str = "fetch_candidates";
pub const STAGE_VISIBILITY: &str = "apply_visibility";
pub const STAGE_CATEGORY: &str = "filter_category";
pub const STAGE_CITY: &str = "filter_city";
pub const STAGE_SEARCH: &str = "filter_search";
pub const STAGE_SORT: &str = "sort_recency";
pub const STAGE_LIMIT: &str = "truncate";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryFilters {
  pub category: Option<Category>,
  /// City to match against `location.city`. The all-locations label means no filter.
  pub city: Option<String>,
  pub search_text: Option<String>,
  pub require_featured: bool,
  pub limit: Option<usize>,
}

impl DiscoveryFilters {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn category(mut self, category: Category) -> Self {
    self.category = Some(category);
    self
  }

  pub fn city(mut self, city: impl Into<String>) -> Self {
    self.city = Some(city.into());
    self
  }

  pub fn search(mut self, text: impl Into<String>) -> Self {
    self.search_text = Some(text.into());
    self
  }

  pub fn featured(mut self) -> Self {
    self.require_featured = true;
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }
}

/// Working state of one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryRun {
  pub filters: DiscoveryFilters,
  pub all_locations: String,
  pub candidates: Vec<Product>,
  pub fetched: usize,
}

impl DiscoveryRun {
  pub fn new(filters: DiscoveryFilters, all_locations: impl Into<String>) -> Self {
    Self {
      filters,
      all_locations: all_locations.into(),
      candidates: Vec::new(),
      fetched: 0,
    }
  }

  /// The city filter, if one is in effect.
  pub fn city_filter(&self) -> Option<&str> {
    self
      .filters
      .city
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty() && *c != self.all_locations)
  }

  /// The lower-cased search needle, if one is in effect.
  pub fn search_needle(&self) -> Option<String> {
    self
      .filters
      .search_text
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_lowercase)
  }

  pub fn retain_visible(&mut self) {
    self.candidates.retain(is_publicly_visible);
  }

  pub fn retain_category(&mut self) {
    if let Some(category) = self.filters.category {
      self.candidates.retain(|p| p.category == category);
    }
  }

  pub fn retain_city(&mut self) {
    if let Some(city) = self.city_filter().map(str::to_string) {
      self.candidates.retain(|p| p.location.city == city);
    }
  }

  pub fn retain_search(&mut self) {
    if let Some(needle) = self.search_needle() {
      self.candidates.retain(|p| p.title.to_lowercase().contains(&needle));
    }
  }

  /// Newest first. Stable, so equal timestamps keep store order; a missing timestamp
  /// orders as the oldest possible value.
  pub fn sort_newest_first(&mut self) {
    self.candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  }

  pub fn truncate(&mut self) {
    if let Some(limit) = self.filters.limit {
      self.candidates.truncate(limit);
    }
  }
}

/// Runs a refinement synchronously under one write guard.
fn refine(ctx: &ContextData<DiscoveryRun>, stage: &'static str, f: fn(&mut DiscoveryRun)) -> StageControl {
  let mut run = ctx.write();
  let before = run.candidates.len();
  f(&mut *run);
  debug!(stage, before, after = run.candidates.len(), "Refined candidates.");
  StageControl::Continue
}

pub struct Discovery {
  pipeline: Pipeline<DiscoveryRun, MandiError>,
  store: Arc<dyn RecordStore>,
  config: MandiConfig,
}

impl Discovery {
  pub fn new(store: Arc<dyn RecordStore>, config: MandiConfig) -> Self {
    let pipeline = build_pipeline(store.clone(), &config);
    Self { pipeline, store, config }
  }

  pub fn config(&self) -> &MandiConfig {
    &self.config
  }

  /// Produces the public, filtered, newest-first feed.
  ///
  /// A store failure (or timeout) is reported as `DiscoveryUnavailable`; nothing is
  /// retried here.
  #[instrument(
    name = "Discovery::discover",
    skip(self),
    fields(category = ?filters.category, featured = filters.require_featured),
    err(Display)
  )]
  pub async fn discover(&self, filters: DiscoveryFilters) -> Result<Vec<Product>> {
    let ctx = ContextData::new(DiscoveryRun::new(filters, self.config.all_locations.clone()));
    let outcome = self.pipeline.run(ctx.clone()).await?;
    let run = ctx.into_inner();
    info!(?outcome, fetched = run.fetched, returned = run.candidates.len(), "Discovery finished.");
    Ok(run.candidates)
  }

  /// Featured listings for the landing page, optionally narrowed to a city.
  pub async fn featured(&self, city: Option<&str>) -> Result<Vec<Product>> {
    let mut filters = DiscoveryFilters::new().featured().limit(self.config.featured_limit);
    filters.city = city.map(str::to_string);
    self.discover(filters).await
  }

  /// A short rail of listings for one category.
  pub async fn category_rail(&self, category: Category) -> Result<Vec<Product>> {
    self
      .discover(DiscoveryFilters::new().category(category).limit(self.config.category_limit))
      .await
  }

  /// Latest news items, newest first.
  #[instrument(name = "Discovery::trending_news", skip(self), err(Display))]
  pub async fn trending_news(&self) -> Result<Vec<NewsItem>> {
    let collection = Collection::News;
    let query = Query::all()
      .order_by_desc("createdAt")
      .limit(self.config.trending_news_limit);
    let docs = within(self.config.store_timeout, self.store.query(&collection, &query))
      .await
      .map_err(|source| MandiError::DiscoveryUnavailable { source })?;
    Ok(decode_lenient(&collection, docs))
  }
}

fn build_pipeline(store: Arc<dyn RecordStore>, config: &MandiConfig) -> Pipeline<DiscoveryRun, MandiError> {
  let mut p = Pipeline::<DiscoveryRun, MandiError>::new([
    StageDef::new(STAGE_FETCH),
    StageDef::new(STAGE_VISIBILITY),
    StageDef::new(STAGE_CATEGORY).skip_if(|ctx: &ContextData<DiscoveryRun>| ctx.read().filters.category.is_none()),
    StageDef::new(STAGE_CITY).skip_if(|ctx: &ContextData<DiscoveryRun>| ctx.read().city_filter().is_none()),
    StageDef::new(STAGE_SEARCH).skip_if(|ctx: &ContextData<DiscoveryRun>| ctx.read().search_needle().is_none()),
    StageDef::new(STAGE_SORT),
    StageDef::new(STAGE_LIMIT).skip_if(|ctx: &ContextData<DiscoveryRun>| ctx.read().filters.limit.is_none()),
  ]);

  let timeout = config.store_timeout;
  p.on(STAGE_FETCH, move |ctx: ContextData<DiscoveryRun>| {
    let store = store.clone();
    async move {
      let featured_only = ctx.read().filters.require_featured;
      let mut query = Query::all().where_eq("status", status_value(ModerationStatus::Approved));
      if featured_only {
        query = query.where_eq("isFeatured", true);
      }

      let collection = Collection::Products;
      let docs = within(timeout, store.query(&collection, &query)).await.map_err(|source| {
        warn!(error = %source, "Candidate fetch failed.");
        MandiError::DiscoveryUnavailable { source }
      })?;
      let products: Vec<Product> = decode_lenient(&collection, docs);

      let mut run = ctx.write();
      run.fetched = products.len();
      run.candidates = products;
      if run.candidates.is_empty() {
        debug!("No candidates; stopping early.");
        return Ok::<_, MandiError>(StageControl::Stop);
      }
      Ok(StageControl::Continue)
    }
  });

  p.on(STAGE_VISIBILITY, |ctx: ContextData<DiscoveryRun>| async move {
    Ok::<_, MandiError>(refine(&ctx, STAGE_VISIBILITY, DiscoveryRun::retain_visible))
  });
  p.on(STAGE_CATEGORY, |ctx: ContextData<DiscoveryRun>| async move {
    Ok::<_, MandiError>(refine(&ctx, STAGE_CATEGORY, DiscoveryRun::retain_category))
  });
  p.on(STAGE_CITY, |ctx: ContextData<DiscoveryRun>| async move {
    Ok::<_, MandiError>(refine(&ctx, STAGE_CITY, DiscoveryRun::retain_city))
  });
  p.on(STAGE_SEARCH, |ctx: ContextData<DiscoveryRun>| async move {
    Ok::<_, MandiError>(refine(&ctx, STAGE_SEARCH, DiscoveryRun::retain_search))
  });
  p.on(STAGE_SORT, |ctx: ContextData<DiscoveryRun>| async move {
    Ok::<_, MandiError>(refine(&ctx, STAGE_SORT, DiscoveryRun::sort_newest_first))
  });
  p.on(STAGE_LIMIT, |ctx: ContextData<DiscoveryRun>| async move {
    Ok::<_, MandiError>(refine(&ctx, STAGE_LIMIT, DiscoveryRun::truncate))
  });

  p
}

/// The stored string form of a status, as used in store predicates.
pub(crate) fn status_value(status: ModerationStatus) -> serde_json::Value {
  serde_json::to_value(status).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sentinel_and_blank_cities_disable_the_city_filter() {
    let run = DiscoveryRun::new(DiscoveryFilters::new().city("All India"), "All India");
    assert_eq!(run.city_filter(), None);
    let run = DiscoveryRun::new(DiscoveryFilters::new().city("  "), "All India");
    assert_eq!(run.city_filter(), None);
    let run = DiscoveryRun::new(DiscoveryFilters::new().city("Jaipur"), "All India");
    assert_eq!(run.city_filter(), Some("Jaipur"));
  }

  #[test]
  fn whitespace_search_is_no_search() {
    let run = DiscoveryRun::new(DiscoveryFilters::new().search("   "), "All India");
    assert_eq!(run.search_needle(), None);
    let run = DiscoveryRun::new(DiscoveryFilters::new().search("  Royal Enfield "), "All India");
    assert_eq!(run.search_needle().as_deref(), Some("royal enfield"));
  }

  #[test]
  fn status_value_uses_stored_spelling() {
    assert_eq!(status_value(ModerationStatus::Approved), serde_json::json!("APPROVED"));
  }
}
