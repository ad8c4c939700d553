// mandi/src/session.rs

//! Per-viewer browsing state with an explicit start/end lifecycle.
//!
//! A `BrowsingSession` owns everything that lives only as long as one viewer is
//! browsing: the comparison shortlist, the set of products whose view was already
//! counted, and the selected location. Components receive it by reference.

use crate::comparison::ComparisonSet;
use crate::config::MandiConfig;
use crate::discovery::DiscoveryFilters;
use crate::error::{MandiError, Result};
use crate::model::{Identity, Product};
use crate::store::{Collection, RecordStore};
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Counts a product view at most once per session, never for the owning seller.
#[derive(Debug, Default)]
pub struct ViewTracker {
  counted: Mutex<HashSet<String>>,
}

impl ViewTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Increments `views` on `product` unless the viewer owns it or this session
  /// already counted it. Returns whether a view was recorded.
  ///
  /// The product is marked before the write so concurrent calls count once; a failed
  /// write unmarks it and is returned to the caller.
  #[instrument(name = "ViewTracker::record_view", skip(self, store, viewer, product), fields(product_id = %product.id), err(Display))]
  pub async fn record_view(&self, store: &dyn RecordStore, viewer: &Identity, product: &Product) -> Result<bool> {
    if viewer.user_id.as_deref().is_some_and(|uid| product.is_owned_by(uid)) {
      debug!("Owner view not counted.");
      return Ok(false);
    }
    if !self.counted.lock().insert(product.id.clone()) {
      return Ok(false);
    }

    match store.increment(&Collection::Products, &product.id, "views", 1).await {
      Ok(()) => Ok(true),
      Err(source) => {
        self.counted.lock().remove(&product.id);
        Err(MandiError::store("record view")(source))
      }
    }
  }

  pub fn has_counted(&self, product_id: &str) -> bool {
    self.counted.lock().contains(product_id)
  }

  pub fn clear(&self) {
    self.counted.lock().clear();
  }
}

#[derive(Debug)]
pub struct BrowsingSession {
  identity: Identity,
  config: MandiConfig,
  comparison: ComparisonSet,
  views: ViewTracker,
  location: Mutex<String>,
}

impl BrowsingSession {
  pub fn start(identity: Identity, config: MandiConfig) -> Self {
    info!(user_id = ?identity.user_id, role = ?identity.role, "Browsing session started.");
    Self {
      comparison: ComparisonSet::new(config.notice_ttl),
      views: ViewTracker::new(),
      location: Mutex::new(config.all_locations.clone()),
      identity,
      config,
    }
  }

  pub fn identity(&self) -> &Identity {
    &self.identity
  }

  pub fn config(&self) -> &MandiConfig {
    &self.config
  }

  pub fn comparison(&self) -> &ComparisonSet {
    &self.comparison
  }

  pub fn views(&self) -> &ViewTracker {
    &self.views
  }

  pub fn location(&self) -> String {
    self.location.lock().clone()
  }

  /// Selects a city; a blank value goes back to all locations.
  pub fn set_location(&self, city: &str) {
    let city = city.trim();
    let next = if city.is_empty() {
      self.config.all_locations.clone()
    } else {
      city.to_string()
    };
    debug!(location = %next, "Location changed.");
    *self.location.lock() = next;
  }

  /// Filters seeded with the selected location.
  pub fn filters(&self) -> DiscoveryFilters {
    DiscoveryFilters::new().city(self.location())
  }

  pub async fn record_view(&self, store: &dyn RecordStore, product: &Product) -> Result<bool> {
    self.views.record_view(store, &self.identity, product).await
  }

  /// Tears the session down; nothing it held survives.
  pub fn end(self) {
    self.comparison.clear();
    self.views.clear();
    info!(user_id = ?self.identity.user_id, "Browsing session ended.");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn location_defaults_to_all_and_blank_resets_it() {
    let session = BrowsingSession::start(Identity::anonymous(), MandiConfig::default());
    assert_eq!(session.location(), "All India");
    session.set_location(" Pune ");
    assert_eq!(session.location(), "Pune");
    assert_eq!(session.filters().city.as_deref(), Some("Pune"));
    session.set_location("");
    assert_eq!(session.location(), "All India");
  }
}
