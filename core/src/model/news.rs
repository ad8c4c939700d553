// mandi/src/model/news.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
  #[serde(default, skip_serializing)]
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub summary: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}
