// mandi/src/model/seller.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Admin-controlled trust state of a seller account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SellerTrust {
  #[default]
  Pending,
  Verified,
  Blocked,
}

impl SellerTrust {
  /// The snapshot written onto owned products when a seller moves to `self`.
  pub fn product_snapshot(self) -> SellerTrust {
    match self {
      SellerTrust::Blocked => SellerTrust::Blocked,
      _ => SellerTrust::Verified,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
  #[serde(default, skip_serializing)]
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub business_name: Option<String>,
  #[serde(default)]
  pub status: SellerTrust,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub block_reason: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}
