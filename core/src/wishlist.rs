// mandi/src/wishlist.rs

//! A user's saved products, persisted under `users/{uid}/wishlist/{product_id}`.
//!
//! Every call goes to the store; nothing is cached here. Calls on different products
//! are independent. For one product, concurrent add/remove settle on whichever write
//! the store applied last.

use crate::error::{MandiError, Result};
use crate::model::{Identity, Product};
use crate::store::{decode_lenient, encode, Collection, Query, Record, RecordStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Saved product snapshot plus when it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
  #[serde(flatten)]
  pub product: Product,
  pub added_at: DateTime<Utc>,
}

impl Record for WishlistEntry {
  fn assign_id(&mut self, id: String) {
    self.product.id = id;
  }
}

#[derive(Clone)]
pub struct Wishlist {
  store: Arc<dyn RecordStore>,
}

impl Wishlist {
  pub fn new(store: Arc<dyn RecordStore>) -> Self {
    Self { store }
  }

  /// Saves (or re-saves) `product`. Adding an already saved product just refreshes
  /// its snapshot.
  #[instrument(name = "Wishlist::add", skip(self, identity, product), fields(product_id = %product.id), err(Display))]
  pub async fn add(&self, identity: &Identity, product: &Product) -> Result<()> {
    let user_id = identity.require_user("wishlist")?;
    if product.id.is_empty() {
      return Err(MandiError::Validation("cannot save a product without an id".to_string()));
    }
    let entry = WishlistEntry {
      product: product.clone(),
      added_at: Utc::now(),
    };
    self
      .store
      .set(&Collection::wishlist(user_id), &product.id, encode(&entry)?)
      .await
      .map_err(MandiError::store("wishlist add"))?;
    debug!(user_id, "Saved to wishlist.");
    Ok(())
  }

  /// Removes `product_id`; removing something not saved is fine.
  #[instrument(name = "Wishlist::remove", skip(self, identity), err(Display))]
  pub async fn remove(&self, identity: &Identity, product_id: &str) -> Result<()> {
    let user_id = identity.require_user("wishlist")?;
    self
      .store
      .delete(&Collection::wishlist(user_id), product_id)
      .await
      .map_err(MandiError::store("wishlist remove"))
  }

  #[instrument(name = "Wishlist::contains", skip(self, identity), err(Display))]
  pub async fn contains(&self, identity: &Identity, product_id: &str) -> Result<bool> {
    let user_id = identity.require_user("wishlist")?;
    let doc = self
      .store
      .get(&Collection::wishlist(user_id), product_id)
      .await
      .map_err(MandiError::store("wishlist lookup"))?;
    Ok(doc.is_some())
  }

  /// Saved entries in the order the store returns them.
  #[instrument(name = "Wishlist::list", skip(self, identity), err(Display))]
  pub async fn list(&self, identity: &Identity) -> Result<Vec<WishlistEntry>> {
    let user_id = identity.require_user("wishlist")?;
    let collection = Collection::wishlist(user_id);
    let docs = self
      .store
      .query(&collection, &Query::all())
      .await
      .map_err(MandiError::store("wishlist list"))?;
    Ok(decode_lenient(&collection, docs))
  }

  /// The saved product snapshots only.
  pub async fn products(&self, identity: &Identity) -> Result<Vec<Product>> {
    Ok(self.list(identity).await?.into_iter().map(|e| e.product).collect())
  }
}
