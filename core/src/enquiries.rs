// mandi/src/enquiries.rs

//! Buyer enquiries about listings and their admin read state.

use crate::error::{MandiError, Result};
use crate::model::{Enquiry, Identity, Product};
use crate::store::{decode_lenient, encode, Collection, Fields, Query, RecordStore};
use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub const DEFAULT_ENQUIRY_MESSAGE: &str = "I am interested in this product. Please share more details.";

/// Contact details and message the buyer fills in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnquiryDraft {
  pub name: String,
  pub email: String,
  pub phone: String,
  /// Left blank, the stock message is sent.
  pub message: String,
}

/// Records an enquiry from the signed-in user about `product` and returns its id.
#[instrument(skip(store, identity, product, draft), fields(product_id = %product.id), err(Display))]
pub async fn submit_enquiry(
  store: &dyn RecordStore,
  identity: &Identity,
  product: &Product,
  draft: EnquiryDraft,
) -> Result<String> {
  let customer_id = identity.require_user("submit enquiry")?;

  let message = match draft.message.trim() {
    "" => DEFAULT_ENQUIRY_MESSAGE.to_string(),
    text => text.to_string(),
  };
  let enquiry = Enquiry {
    id: String::new(),
    product_id: product.id.clone(),
    product_name: product.title.clone(),
    seller_id: product.seller_id.clone(),
    customer_id: customer_id.to_string(),
    customer_name: draft.name.trim().to_string(),
    customer_email: draft.email.trim().to_string(),
    customer_phone: draft.phone.trim().to_string(),
    message,
    created_at: Some(Utc::now()),
    admin_read: false,
    is_admin_product: product.admin_origin,
  };

  let id = store
    .create(&Collection::Enquiries, encode(&enquiry)?)
    .await
    .map_err(MandiError::store("submit enquiry"))?;
  info!(enquiry_id = %id, seller_id = %enquiry.seller_id, "Enquiry submitted.");
  Ok(id)
}

/// Enquiries addressed to the signed-in seller.
#[instrument(skip_all, err(Display))]
pub async fn seller_enquiries(store: &dyn RecordStore, identity: &Identity) -> Result<Vec<Enquiry>> {
  let seller_id = identity.require_seller_or_admin("seller enquiries")?;
  let collection = Collection::Enquiries;
  let docs = store
    .query(
      &collection,
      &Query::all().where_eq("sellerId", seller_id).order_by_desc("createdAt"),
    )
    .await
    .map_err(MandiError::store("seller enquiries"))?;
  Ok(decode_lenient(&collection, docs))
}

/// Every enquiry, newest first. Admin only.
#[instrument(skip_all, err(Display))]
pub async fn all_enquiries(store: &dyn RecordStore, identity: &Identity) -> Result<Vec<Enquiry>> {
  identity.require_admin("list enquiries")?;
  let collection = Collection::Enquiries;
  let docs = store
    .query(&collection, &Query::all().order_by_desc("createdAt"))
    .await
    .map_err(MandiError::store("list enquiries"))?;
  Ok(decode_lenient(&collection, docs))
}

/// Flags every unread enquiry in `enquiries` as read by an admin and returns how many
/// were written. Writes that fail are reported together as `PartialWrite`; the ones
/// that succeeded stay written.
#[instrument(skip(store, identity, enquiries), fields(count = enquiries.len()), err(Display))]
pub async fn mark_enquiries_read(store: &dyn RecordStore, identity: &Identity, enquiries: &[Enquiry]) -> Result<usize> {
  identity.require_admin("mark enquiries read")?;

  let mut written = 0;
  let mut failed = Vec::new();
  for enquiry in enquiries.iter().filter(|e| !e.admin_read) {
    let mut patch = Fields::new();
    patch.insert("adminRead".to_string(), Value::Bool(true));
    match store.update(&Collection::Enquiries, &enquiry.id, patch).await {
      Ok(()) => written += 1,
      Err(e) => {
        warn!(enquiry_id = %enquiry.id, error = %e, "Could not mark enquiry read.");
        failed.push(enquiry.id.clone());
      }
    }
  }

  if failed.is_empty() {
    Ok(written)
  } else {
    Err(MandiError::PartialWrite {
      operation: "mark enquiries read",
      failed,
    })
  }
}
