// mandi/src/listings.rs

//! Listing lifecycle: creation by sellers and admins, content edits, the seller's own
//! listing table and the guarded single-product read.

use crate::error::{MandiError, Result};
use crate::model::{Category, Condition, Identity, Location, ModerationStatus, Product, Role, SellerTrust, UsedDetails};
use crate::store::{decode_lenient, encode, fetch, Collection, Fields, Query, RecordStore};
use crate::visibility::is_visible_to;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub const ADMIN_SELLER_NAME: &str = "Admin product(highly verified)";

#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
  pub title: String,
  pub price: f64,
  pub category: Category,
  pub condition: Condition,
  pub description: String,
  pub location: Location,
  pub used: UsedDetails,
  /// Display name shown on the listing; admins always list under `ADMIN_SELLER_NAME`.
  pub seller_name: Option<String>,
}

/// Content changes a seller (or admin) may make. `None` leaves a field alone.
/// Moderation status, trust snapshot, admin flag and views are not editable here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingEdit {
  pub title: Option<String>,
  pub price: Option<f64>,
  pub category: Option<Category>,
  pub condition: Option<Condition>,
  pub description: Option<String>,
  pub location: Option<Location>,
  pub images: Option<Vec<String>>,
  pub used: Option<UsedDetails>,
}

const USED_FIELDS: [&str; 3] = ["yearOfPurchase", "usage", "ownersCount"];

impl ListingEdit {
  /// Builds the update patch against the product's stored `current` condition.
  fn to_patch(&self, current: Condition) -> Result<Fields> {
    let mut patch = Fields::new();
    let mut put = |key: &str, value: Result<Value, serde_json::Error>| -> Result<()> {
      let value = value.map_err(|e| MandiError::Validation(format!("bad value for {}: {}", key, e)))?;
      patch.insert(key.to_string(), value);
      Ok(())
    };

    if let Some(title) = &self.title {
      put("title", Ok(Value::from(validated_title(title)?)))?;
    }
    if let Some(price) = self.price {
      put("price", Ok(Value::from(validated_price(price)?)))?;
    }
    if let Some(category) = self.category {
      put("category", serde_json::to_value(category))?;
    }
    if let Some(condition) = self.condition {
      put("condition", serde_json::to_value(condition))?;
    }
    if let Some(description) = &self.description {
      put("description", Ok(Value::from(description.clone())))?;
    }
    if let Some(location) = &self.location {
      put("location", serde_json::to_value(location))?;
    }
    if let Some(images) = &self.images {
      put("images", serde_json::to_value(images))?;
    }
    // New listings never carry second-hand details, whether the edit switches the
    // condition or only sends used fields for a product that is already New.
    match self.condition.unwrap_or(current) {
      Condition::Used => {
        if let Some(used) = &self.used {
          put("yearOfPurchase", serde_json::to_value(used.year_of_purchase))?;
          put("usage", serde_json::to_value(&used.usage))?;
          put("ownersCount", serde_json::to_value(&used.owners_count))?;
        }
      }
      Condition::New if self.condition.is_some() || self.used.is_some() => {
        for key in USED_FIELDS {
          patch.insert(key.to_string(), Value::Null);
        }
      }
      Condition::New => {}
    }
    patch.insert("updatedAt".to_string(), Value::from(Utc::now().to_rfc3339()));
    Ok(patch)
  }
}

fn validated_price(price: f64) -> Result<f64> {
  if !price.is_finite() || price < 0.0 {
    return Err(MandiError::Validation(format!("invalid price {}", price)));
  }
  Ok(price)
}

fn validated_title(title: &str) -> Result<String> {
  let title = title.trim();
  if title.is_empty() {
    return Err(MandiError::Validation("listing title is required".to_string()));
  }
  Ok(title.to_string())
}

/// Creates a listing and returns its id.
///
/// Seller listings start `PENDING` with a `PENDING` trust snapshot and wait for
/// moderation. Admin listings go live immediately: approved, verified, admin-origin
/// and featured.
#[instrument(skip(store, identity, draft, images), fields(category = %draft.category), err(Display))]
pub async fn create_listing(
  store: &dyn RecordStore,
  identity: &Identity,
  draft: ListingDraft,
  images: Vec<String>,
) -> Result<String> {
  let user_id = identity.require_seller_or_admin("create listing")?.to_string();
  let is_admin = identity.role == Role::Admin;
  let now = Utc::now();

  let product = Product {
    id: String::new(),
    title: validated_title(&draft.title)?,
    price: validated_price(draft.price)?,
    category: draft.category,
    condition: draft.condition,
    description: draft.description,
    location: draft.location,
    images,
    seller_id: user_id,
    seller_name: if is_admin {
      ADMIN_SELLER_NAME.to_string()
    } else {
      draft.seller_name.unwrap_or_else(|| "Seller".to_string())
    },
    moderation_status: if is_admin {
      ModerationStatus::Approved
    } else {
      ModerationStatus::Pending
    },
    seller_trust: if is_admin {
      SellerTrust::Verified
    } else {
      SellerTrust::Pending
    },
    admin_origin: is_admin,
    is_featured: is_admin,
    views: 0,
    created_at: Some(now),
    updated_at: Some(now),
    used: match draft.condition {
      Condition::New => UsedDetails::default(),
      Condition::Used => draft.used,
    },
  };

  let id = store
    .create(&Collection::Products, encode(&product)?)
    .await
    .map_err(MandiError::store("create listing"))?;
  info!(product_id = %id, admin_origin = is_admin, "Listing created.");
  Ok(id)
}

/// Applies a content edit. Only the owning seller or an admin may edit.
#[instrument(skip(store, identity, edit), err(Display))]
pub async fn update_listing(
  store: &dyn RecordStore,
  identity: &Identity,
  product_id: &str,
  edit: &ListingEdit,
) -> Result<()> {
  let user_id = identity.require_seller_or_admin("edit listing")?;
  let product: Product = fetch(store, &Collection::Products, product_id)
    .await?
    .ok_or_else(|| MandiError::NotFound {
      collection: Collection::Products.path(),
      id: product_id.to_string(),
    })?;
  if !identity.is_admin() && !product.is_owned_by(user_id) {
    warn!(user_id, "Edit refused for non-owner.");
    return Err(MandiError::Forbidden { operation: "edit listing" });
  }

  store
    .update(&Collection::Products, product_id, edit.to_patch(product.condition)?)
    .await
    .map_err(MandiError::store("edit listing"))
}

/// Every listing owned by the signed-in seller, whatever its moderation state.
#[instrument(skip_all, err(Display))]
pub async fn seller_listings(store: &dyn RecordStore, identity: &Identity) -> Result<Vec<Product>> {
  let user_id = identity.require_seller_or_admin("seller listings")?;
  let collection = Collection::Products;
  let docs = store
    .query(&collection, &Query::all().where_eq("sellerId", user_id))
    .await
    .map_err(MandiError::store("seller listings"))?;
  Ok(decode_lenient(&collection, docs))
}

/// Loads one product for display. Admins see every state; for anyone else a product
/// failing the visibility policy reads as absent.
#[instrument(skip(store, identity), err(Display))]
pub async fn fetch_product(store: &dyn RecordStore, identity: &Identity, product_id: &str) -> Result<Option<Product>> {
  let product: Option<Product> = fetch(store, &Collection::Products, product_id).await?;
  Ok(product.filter(|p| is_visible_to(identity, p)))
}
