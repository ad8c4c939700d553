// mandi/src/moderation.rs

//! Admin moderation of listings and sellers.
//!
//! Products carry a denormalised copy of their seller's trust (`sellerStatus`) so the
//! public feed needs no join. Changing a seller's trust therefore has to be cascaded
//! onto every product the seller owns. The cascade is idempotent: products already at
//! the target snapshot are skipped, so a partially applied cascade can simply be run
//! again until it converges.

use crate::error::{MandiError, Result};
use crate::model::{Identity, ModerationStatus, SellerTrust};
use crate::store::{Collection, Fields, Query, RecordStore};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of a fully applied trust cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
  pub seller_id: String,
  /// The snapshot now carried by every owned product.
  pub trust: SellerTrust,
  /// Products written by this run. Ones already in step are not listed.
  pub updated: Vec<String>,
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value> {
  serde_json::to_value(value).map_err(|e| MandiError::Validation(format!("unencodable value: {}", e)))
}

/// Moves a listing to `status`. Admin only.
#[instrument(skip(store, identity), err(Display))]
pub async fn set_product_status(
  store: &dyn RecordStore,
  identity: &Identity,
  product_id: &str,
  status: ModerationStatus,
) -> Result<()> {
  identity.require_admin("moderate product")?;
  let mut patch = Fields::new();
  patch.insert("status".to_string(), to_value(status)?);
  patch.insert("updatedAt".to_string(), Value::from(Utc::now().to_rfc3339()));
  store
    .update(&Collection::Products, product_id, patch)
    .await
    .map_err(MandiError::store("moderate product"))?;
  info!(product_id, ?status, "Product moderated.");
  Ok(())
}

/// Sets a seller's trust state and cascades it onto the seller's products. Admin only.
///
/// Blocking requires a non-empty reason; any other state clears a previous reason.
/// The seller record is written first, so a cascade that fails part way leaves the
/// seller correct and the product snapshots catching up on the next run.
#[instrument(skip(store, identity, block_reason), err(Display))]
pub async fn set_seller_status(
  store: &dyn RecordStore,
  identity: &Identity,
  seller_id: &str,
  trust: SellerTrust,
  block_reason: Option<&str>,
) -> Result<CascadeReport> {
  identity.require_admin("set seller status")?;

  let reason = block_reason.map(str::trim).filter(|r| !r.is_empty());
  let mut patch = Fields::new();
  patch.insert("status".to_string(), to_value(trust)?);
  match (trust, reason) {
    (SellerTrust::Blocked, Some(reason)) => {
      patch.insert("blockReason".to_string(), Value::from(reason));
    }
    (SellerTrust::Blocked, None) => {
      return Err(MandiError::Validation("a reason is required to block a seller".to_string()));
    }
    _ => {
      patch.insert("blockReason".to_string(), Value::Null);
    }
  }

  store
    .update(&Collection::Sellers, seller_id, patch)
    .await
    .map_err(MandiError::store("set seller status"))?;
  info!(seller_id, ?trust, "Seller status updated.");

  cascade_seller_trust(store, seller_id, trust).await
}

/// Writes the product snapshot for `trust` onto every product owned by `seller_id`.
///
/// Works on the raw documents and reads nothing but `sellerStatus`, so a product the
/// typed model cannot decode is still brought into step. Every owned product is
/// attempted even after a failure. If any write fails the result is
/// `CascadeIncomplete` naming the failed ids; running the cascade again touches only
/// the products still out of step.
#[instrument(skip(store), err(Display))]
pub async fn cascade_seller_trust(store: &dyn RecordStore, seller_id: &str, trust: SellerTrust) -> Result<CascadeReport> {
  let snapshot = trust.product_snapshot();
  let target = to_value(snapshot)?;
  let collection = Collection::Products;
  let docs = store
    .query(&collection, &Query::all().where_eq("sellerId", seller_id))
    .await
    .map_err(MandiError::store("cascade seller trust"))?;
  let owned = docs.len();

  let mut updated = Vec::new();
  let mut failed = Vec::new();
  for doc in docs.into_iter().filter(|d| d.field("sellerStatus") != Some(&target)) {
    let mut patch = Fields::new();
    patch.insert("sellerStatus".to_string(), target.clone());
    match store.update(&collection, &doc.id, patch).await {
      Ok(()) => updated.push(doc.id),
      Err(e) => {
        error!(product_id = %doc.id, error = %e, "Trust snapshot write failed.");
        failed.push(doc.id);
      }
    }
  }

  if !failed.is_empty() {
    warn!(seller_id, updated = updated.len(), failed = failed.len(), "Cascade incomplete; safe to re-run.");
    return Err(MandiError::CascadeIncomplete {
      seller_id: seller_id.to_string(),
      updated: updated.len(),
      failed,
    });
  }

  debug!(owned, updated = updated.len(), "Cascade applied.");
  Ok(CascadeReport {
    seller_id: seller_id.to_string(),
    trust: snapshot,
    updated,
  })
}
