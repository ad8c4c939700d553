// mandi/src/store/mod.rs

//! The record-store boundary.
//!
//! The core treats the remote document database as a generic collection store reached
//! through [`RecordStore`]. No wire protocol is assumed; `MemoryStore` is the in-process
//! implementation used by tests and demos.

pub mod memory;
pub mod typed;

use crate::error::StoreResult;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use typed::{decode, decode_lenient, encode, fetch, fetch_where, within, Record};

/// Stored document body, without its id.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
  Products,
  Sellers,
  Enquiries,
  News,
  /// `users/{user_id}/wishlist`
  Wishlist { user_id: String },
}

impl Collection {
  pub fn wishlist(user_id: impl Into<String>) -> Self {
    Collection::Wishlist { user_id: user_id.into() }
  }

  pub fn path(&self) -> String {
    match self {
      Collection::Products => "products".to_string(),
      Collection::Sellers => "sellers".to_string(),
      Collection::Enquiries => "enquiries".to_string(),
      Collection::News => "product_news".to_string(),
      Collection::Wishlist { user_id } => format!("users/{}/wishlist", user_id),
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.path())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub id: String,
  pub fields: Fields,
}

impl Document {
  pub fn new(id: impl Into<String>, fields: Fields) -> Self {
    Self { id: id.into(), fields }
  }

  /// Looks up a possibly dotted field path such as `location.city`.
  pub fn field(&self, path: &str) -> Option<&Value> {
    lookup(&self.fields, path)
  }
}

pub(crate) fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
  let mut parts = path.split('.');
  let mut current = fields.get(parts.next()?)?;
  for part in parts {
    current = current.as_object()?.get(part)?;
  }
  Some(current)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
  pub field: String,
  pub equals: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
  pub field: String,
  pub descending: bool,
}

/// Conjunction of equality predicates with optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
  pub predicates: Vec<Predicate>,
  pub order_by: Option<OrderBy>,
  pub limit: Option<usize>,
}

impl Query {
  pub fn all() -> Self {
    Self::default()
  }

  pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.predicates.push(Predicate {
      field: field.into(),
      equals: value.into(),
    });
    self
  }

  pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
    self.order_by = Some(OrderBy {
      field: field.into(),
      descending: true,
    });
    self
  }

  pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
    self.order_by = Some(OrderBy {
      field: field.into(),
      descending: false,
    });
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn matches(&self, fields: &Fields) -> bool {
    self
      .predicates
      .iter()
      .all(|p| lookup(fields, &p.field) == Some(&p.equals))
  }

  /// Filters, orders (stable) and truncates `docs` the way a store would.
  pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
    let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(&d.fields)).collect();
    if let Some(order) = &self.order_by {
      out.sort_by(|a, b| {
        let ord = compare_values(a.field(&order.field), b.field(&order.field));
        if order.descending {
          ord.reverse()
        } else {
          ord
        }
      });
    }
    if let Some(limit) = self.limit {
      out.truncate(limit);
    }
    out
  }
}

/// Missing and null sort lowest. RFC 3339 strings compare as instants.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  let a = a.filter(|v| !v.is_null());
  let b = b.filter(|v| !v.is_null());
  match (a, b) {
    (None, None) => Ordering::Equal,
    (None, Some(_)) => Ordering::Less,
    (Some(_), None) => Ordering::Greater,
    (Some(Value::Number(x)), Some(Value::Number(y))) => {
      let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
    (Some(Value::String(x)), Some(Value::String(y))) => {
      match (
        chrono::DateTime::parse_from_rfc3339(x),
        chrono::DateTime::parse_from_rfc3339(y),
      ) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => x.cmp(y),
      }
    }
    (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
    (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
  }
}

/// Receives the full current result set of a subscribed query on every change.
pub type ChangeCallback = Arc<dyn Fn(Vec<Document>) + Send + Sync + 'static>;

/// A live change-feed registration. Cancelled by `unsubscribe` or on drop.
pub struct Subscription {
  cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
  pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
    Self {
      cancel: Some(Box::new(cancel)),
    }
  }

  pub fn unsubscribe(mut self) {
    self.cancel_now();
  }

  fn cancel_now(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.cancel_now();
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("live", &self.cancel.is_some())
      .finish()
  }
}

/// Generic document-collection access. The sole persistence boundary of the crate.
#[async_trait]
pub trait RecordStore: Send + Sync {
  async fn get(&self, collection: &Collection, id: &str) -> StoreResult<Option<Document>>;

  async fn query(&self, collection: &Collection, query: &Query) -> StoreResult<Vec<Document>>;

  /// Inserts a new document and returns its generated id.
  async fn create(&self, collection: &Collection, fields: Fields) -> StoreResult<String>;

  /// Writes the document at `id`, replacing any existing body.
  async fn set(&self, collection: &Collection, id: &str, fields: Fields) -> StoreResult<()>;

  /// Merges `patch` into an existing document. `StoreError::NotFound` if absent.
  async fn update(&self, collection: &Collection, id: &str, patch: Fields) -> StoreResult<()>;

  /// Deletes the document at `id`; absent documents are not an error.
  async fn delete(&self, collection: &Collection, id: &str) -> StoreResult<()>;

  /// Atomically adds `by` to a numeric field (missing counts as zero).
  async fn increment(&self, collection: &Collection, id: &str, field: &str, by: i64) -> StoreResult<()>;

  /// Delivers the current result set immediately, then again after every change.
  async fn subscribe(
    &self,
    collection: &Collection,
    query: &Query,
    on_change: ChangeCallback,
  ) -> StoreResult<Subscription>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn doc(id: &str, body: Value) -> Document {
    Document::new(id, body.as_object().cloned().unwrap_or_default())
  }

  #[test]
  fn query_orders_timestamps_as_instants_and_missing_last() {
    let docs = vec![
      doc("a", json!({"createdAt": "2024-05-01T10:00:00Z"})),
      doc("b", json!({})),
      doc("c", json!({"createdAt": "2024-05-01T10:00:00.500Z"})),
    ];
    let out = Query::all().order_by_desc("createdAt").apply(docs);
    let ids: Vec<_> = out.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
  }

  #[test]
  fn predicates_follow_dotted_paths() {
    let d = doc("a", json!({"location": {"city": "Pune"}, "status": "APPROVED"}));
    assert!(Query::all().where_eq("location.city", "Pune").matches(&d.fields));
    assert!(!Query::all()
      .where_eq("location.city", "Pune")
      .where_eq("status", "PENDING")
      .matches(&d.fields));
  }

  #[test]
  fn dropping_a_subscription_cancels_it_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let sub = Subscription::new(move || {
      h.fetch_add(1, Ordering::SeqCst);
    });
    drop(sub);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }
}
