// mandi/src/model/product.rs

use super::loose;
use super::seller::SellerTrust;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
  Cars,
  Mobiles,
  Bikes,
  Agriproducts,
  #[serde(rename = "Home Appliances")]
  HomeAppliances,
  Others,
}

impl Category {
  pub const ALL: [Category; 6] = [
    Category::Cars,
    Category::Mobiles,
    Category::Bikes,
    Category::Agriproducts,
    Category::HomeAppliances,
    Category::Others,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Category::Cars => "Cars",
      Category::Mobiles => "Mobiles",
      Category::Bikes => "Bikes",
      Category::Agriproducts => "Agriproducts",
      Category::HomeAppliances => "Home Appliances",
      Category::Others => "Others",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
  New,
  Used,
}

/// Admin-controlled moderation state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
}

impl Location {
  pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
    Self {
      city: city.into(),
      state: state.into(),
    }
  }
}

/// Extra facts carried by second-hand listings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedDetails {
  #[serde(default, deserialize_with = "loose::opt_year", skip_serializing_if = "Option::is_none")]
  pub year_of_purchase: Option<u16>,
  #[serde(default, deserialize_with = "loose::opt_text", skip_serializing_if = "Option::is_none")]
  pub usage: Option<String>,
  /// Kept as text: the form offers `1`, `2`, `3` and `4+`.
  #[serde(default, deserialize_with = "loose::opt_text", skip_serializing_if = "Option::is_none")]
  pub owners_count: Option<String>,
}

impl UsedDetails {
  pub fn is_empty(&self) -> bool {
    self.year_of_purchase.is_none() && self.usage.is_none() && self.owners_count.is_none()
  }
}

/// A marketplace listing.
///
/// `seller_trust` is a snapshot of the owning seller's status, copied here so the public
/// feed can be filtered without a join. Changing a seller's status must cascade onto
/// every product they own (see `moderation::cascade_seller_trust`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  /// Document id; lives outside the stored fields.
  #[serde(default, skip_serializing)]
  pub id: String,
  pub title: String,
  #[serde(deserialize_with = "loose::price")]
  pub price: f64,
  pub category: Category,
  pub condition: Condition,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub location: Location,
  #[serde(default)]
  pub images: Vec<String>,
  pub seller_id: String,
  #[serde(default)]
  pub seller_name: String,
  #[serde(rename = "status", default)]
  pub moderation_status: ModerationStatus,
  #[serde(rename = "sellerStatus", default)]
  pub seller_trust: SellerTrust,
  #[serde(rename = "isAdminProduct", default)]
  pub admin_origin: bool,
  #[serde(default)]
  pub is_featured: bool,
  #[serde(default)]
  pub views: u64,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub used: UsedDetails,
}

impl Product {
  pub fn is_owned_by(&self, user_id: &str) -> bool {
    self.seller_id == user_id
  }
}
