// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset of these helpers.

use chrono::{DateTime, TimeZone, Utc};
use mandi::core::context::Handler;
use mandi::store::encode;
use mandi::{
  Category, Collection, Condition, ContextData, Location, MemoryStore, ModerationStatus, PipelineError, Product,
  SellerTrust, StageControl, UsedDetails,
};
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::Level;

// --- Stage engine fixtures ---

#[derive(Clone, Debug, Default)]
pub struct StageLog {
  pub counter: i32,
  pub trail: String,
  pub stages_run: Vec<String>,
  pub stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Pipeline wiring error: {0}")]
  Pipeline(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<PipelineError> for TestError {
  fn from(e: PipelineError) -> Self {
    TestError::Pipeline(format!("{:?}", e))
  }
}

/// Appends `mark` to the trail and stops if `stop_at` names this handler.
pub fn recording_handler(name: &'static str, mark: &'static str) -> Handler<StageLog, TestError> {
  Box::new(move |ctx: ContextData<StageLog>| {
    Box::pin(async move {
      let mut log = ctx.write();
      log.counter += 1;
      log.trail.push_str(mark);
      log.stages_run.push(name.to_string());
      tracing::debug!(target: "test_handlers", handler = name, counter = log.counter, "ran");
      if log.stop_at.as_deref() == Some(name) {
        return Ok(StageControl::Stop);
      }
      Ok(StageControl::Continue)
    })
  })
}

pub fn failing_handler(name: &'static str, message: &'static str) -> Handler<StageLog, TestError> {
  Box::new(move |ctx: ContextData<StageLog>| {
    Box::pin(async move {
      ctx.write().stages_run.push(name.to_string());
      tracing::warn!(target: "test_handlers", handler = name, "failing with: '{}'", message);
      Err(TestError::Handler(message.to_string()))
    })
  })
}

// --- Tracing setup (once per test binary) ---

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Marketplace fixtures ---

pub const ALL_INDIA: &str = "All India";

/// A fixed instant `offset` hours after a base date, so ordering is obvious.
pub fn at(offset: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(offset)
}

/// An approved listing by a verified seller, created at `at(created)`.
pub fn listing(id: &str, category: Category, city: &str, created: i64) -> Product {
  Product {
    id: id.to_string(),
    title: id.to_string(),
    price: 50_000.0,
    category,
    condition: Condition::Used,
    description: format!("{} in good condition", id),
    location: Location::new(city, ""),
    images: vec![format!("https://img.example/{}.jpg", id)],
    seller_id: "seller-1".to_string(),
    seller_name: "Seller One".to_string(),
    moderation_status: ModerationStatus::Approved,
    seller_trust: SellerTrust::Verified,
    admin_origin: false,
    is_featured: false,
    views: 0,
    created_at: Some(at(created)),
    updated_at: None,
    used: UsedDetails::default(),
  }
}

pub fn with_state(mut product: Product, status: ModerationStatus, trust: SellerTrust, admin_origin: bool) -> Product {
  product.moderation_status = status;
  product.seller_trust = trust;
  product.admin_origin = admin_origin;
  product
}

pub fn owned_by(mut product: Product, seller_id: &str) -> Product {
  product.seller_id = seller_id.to_string();
  product
}

pub fn featured(mut product: Product) -> Product {
  product.is_featured = true;
  product
}

pub fn seed_product(store: &MemoryStore, product: &Product) {
  store.seed(&Collection::Products, product.id.clone(), encode(product).unwrap());
}

pub fn seed_products(store: &MemoryStore, products: &[Product]) {
  for p in products {
    seed_product(store, p);
  }
}

/// Seeds a raw document, for shapes the typed model would not produce.
pub fn seed_raw(store: &MemoryStore, collection: &Collection, id: &str, body: Value) {
  store.seed(collection, id, body.as_object().cloned().unwrap_or_default());
}

pub fn ids(products: &[Product]) -> Vec<&str> {
  products.iter().map(|p| p.id.as_str()).collect()
}
