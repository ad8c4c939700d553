// mandi/src/model/enquiry.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A buyer's message about a listing. Only `admin_read` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enquiry {
  #[serde(default, skip_serializing)]
  pub id: String,
  pub product_id: String,
  #[serde(default)]
  pub product_name: String,
  pub seller_id: String,
  pub customer_id: String,
  #[serde(default)]
  pub customer_name: String,
  #[serde(default)]
  pub customer_email: String,
  #[serde(default)]
  pub customer_phone: String,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub admin_read: bool,
  #[serde(default)]
  pub is_admin_product: bool,
}
