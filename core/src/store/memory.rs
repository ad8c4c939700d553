// mandi/src/store/memory.rs

//! In-process `RecordStore` with synchronous change delivery and fault injection.
//!
//! Documents keep insertion order per collection. After every successful write the
//! watchers of that collection receive their query's full current result set.

use super::{ChangeCallback, Collection, Document, Fields, Query, RecordStore, Subscription};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};
use uuid::Uuid;

struct Watcher {
  id: u64,
  collection: String,
  query: Query,
  callback: ChangeCallback,
}

#[derive(Default)]
struct Faults {
  offline: bool,
  failing_writes: HashSet<String>,
  denied_feeds: HashSet<String>,
}

#[derive(Default)]
struct Inner {
  collections: RwLock<HashMap<String, Vec<Document>>>,
  watchers: Mutex<Vec<Watcher>>,
  // Held while callbacks run and while a watcher is removed, so a cancelled watcher is
  // never invoked afterwards. Reentrant because callbacks may unsubscribe.
  delivery: ReentrantMutex<()>,
  next_watcher: AtomicU64,
  faults: RwLock<Faults>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts or replaces a document without notifying watchers. For fixtures.
  pub fn seed(&self, collection: &Collection, id: impl Into<String>, fields: Fields) {
    let id = id.into();
    let mut collections = self.inner.collections.write();
    let docs = collections.entry(collection.path()).or_default();
    match docs.iter_mut().find(|d| d.id == id) {
      Some(existing) => existing.fields = fields,
      None => docs.push(Document::new(id, fields)),
    }
  }

  pub fn documents(&self, collection: &Collection) -> Vec<Document> {
    self
      .inner
      .collections
      .read()
      .get(&collection.path())
      .cloned()
      .unwrap_or_default()
  }

  pub fn watcher_count(&self) -> usize {
    self.inner.watchers.lock().len()
  }

  /// While offline every read and subscription fails with `Unavailable`.
  pub fn set_offline(&self, offline: bool) {
    self.inner.faults.write().offline = offline;
  }

  /// Writes addressed to any of these document ids fail until `clear_faults`.
  pub fn fail_writes_to<I, S>(&self, ids: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .inner
      .faults
      .write()
      .failing_writes
      .extend(ids.into_iter().map(Into::into));
  }

  /// Subscriptions on this collection are refused with `PermissionDenied`.
  pub fn deny_subscriptions(&self, collection: &Collection) {
    self.inner.faults.write().denied_feeds.insert(collection.path());
  }

  pub fn clear_faults(&self) {
    *self.inner.faults.write() = Faults::default();
  }

  fn check_online(&self) -> StoreResult<()> {
    if self.inner.faults.read().offline {
      return Err(StoreError::Unavailable("memory store is offline".to_string()));
    }
    Ok(())
  }

  fn check_writable(&self, collection: &Collection, id: &str) -> StoreResult<()> {
    self.check_online()?;
    if self.inner.faults.read().failing_writes.contains(id) {
      return Err(StoreError::Unavailable(format!("write to {}/{} rejected", collection, id)));
    }
    Ok(())
  }

  fn with_doc_mut<R>(
    &self,
    collection: &Collection,
    id: &str,
    f: impl FnOnce(&mut Fields) -> StoreResult<R>,
  ) -> StoreResult<R> {
    let mut collections = self.inner.collections.write();
    let doc = collections
      .get_mut(&collection.path())
      .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
      .ok_or_else(|| StoreError::NotFound {
        collection: collection.path(),
        id: id.to_string(),
      })?;
    f(&mut doc.fields)
  }

  fn results_for(&self, path: &str, query: &Query) -> Vec<Document> {
    let collections = self.inner.collections.read();
    let docs = collections.get(path).cloned().unwrap_or_default();
    query.apply(docs)
  }

  fn notify(&self, collection: &Collection) {
    let path = collection.path();
    let _delivering = self.inner.delivery.lock();
    let targets: Vec<(u64, Query, ChangeCallback)> = self
      .inner
      .watchers
      .lock()
      .iter()
      .filter(|w| w.collection == path)
      .map(|w| (w.id, w.query.clone(), w.callback.clone()))
      .collect();

    for (watcher_id, query, callback) in targets {
      // An earlier callback in this round may have cancelled this watcher.
      let still_live = self.inner.watchers.lock().iter().any(|w| w.id == watcher_id);
      if !still_live {
        continue;
      }
      trace!(collection = %path, watcher_id, "Delivering change.");
      callback(self.results_for(&path, &query));
    }
  }
}

fn remove_watcher(inner: &Weak<Inner>, watcher_id: u64) {
  if let Some(inner) = inner.upgrade() {
    let _delivering = inner.delivery.lock();
    inner.watchers.lock().retain(|w| w.id != watcher_id);
    debug!(watcher_id, "Watcher removed.");
  }
}

#[async_trait]
impl RecordStore for MemoryStore {
  async fn get(&self, collection: &Collection, id: &str) -> StoreResult<Option<Document>> {
    self.check_online()?;
    Ok(
      self
        .inner
        .collections
        .read()
        .get(&collection.path())
        .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()),
    )
  }

  async fn query(&self, collection: &Collection, query: &Query) -> StoreResult<Vec<Document>> {
    self.check_online()?;
    Ok(self.results_for(&collection.path(), query))
  }

  async fn create(&self, collection: &Collection, fields: Fields) -> StoreResult<String> {
    self.check_online()?;
    let id = Uuid::new_v4().simple().to_string();
    self
      .inner
      .collections
      .write()
      .entry(collection.path())
      .or_default()
      .push(Document::new(id.clone(), fields));
    self.notify(collection);
    Ok(id)
  }

  async fn set(&self, collection: &Collection, id: &str, fields: Fields) -> StoreResult<()> {
    self.check_writable(collection, id)?;
    self.seed(collection, id, fields);
    self.notify(collection);
    Ok(())
  }

  async fn update(&self, collection: &Collection, id: &str, patch: Fields) -> StoreResult<()> {
    self.check_writable(collection, id)?;
    self.with_doc_mut(collection, id, |fields| {
      fields.extend(patch);
      Ok(())
    })?;
    self.notify(collection);
    Ok(())
  }

  async fn delete(&self, collection: &Collection, id: &str) -> StoreResult<()> {
    self.check_writable(collection, id)?;
    let removed = {
      let mut collections = self.inner.collections.write();
      match collections.get_mut(&collection.path()) {
        Some(docs) => {
          let before = docs.len();
          docs.retain(|d| d.id != id);
          docs.len() != before
        }
        None => false,
      }
    };
    if removed {
      self.notify(collection);
    }
    Ok(())
  }

  async fn increment(&self, collection: &Collection, id: &str, field: &str, by: i64) -> StoreResult<()> {
    self.check_writable(collection, id)?;
    self.with_doc_mut(collection, id, |fields| {
      let current = fields.get(field).and_then(Value::as_i64).unwrap_or(0);
      fields.insert(field.to_string(), Value::from(current.saturating_add(by)));
      Ok(())
    })?;
    self.notify(collection);
    Ok(())
  }

  async fn subscribe(
    &self,
    collection: &Collection,
    query: &Query,
    on_change: ChangeCallback,
  ) -> StoreResult<Subscription> {
    self.check_online()?;
    let path = collection.path();
    if self.inner.faults.read().denied_feeds.contains(&path) {
      return Err(StoreError::PermissionDenied { collection: path });
    }

    let watcher_id = self.inner.next_watcher.fetch_add(1, Ordering::SeqCst);
    {
      let _delivering = self.inner.delivery.lock();
      self.inner.watchers.lock().push(Watcher {
        id: watcher_id,
        collection: path.clone(),
        query: query.clone(),
        callback: on_change.clone(),
      });
      on_change(self.results_for(&path, query));
    }
    debug!(collection = %path, watcher_id, "Watcher registered.");

    let weak = Arc::downgrade(&self.inner);
    Ok(Subscription::new(move || remove_watcher(&weak, watcher_id)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::atomic::AtomicUsize;

  fn fields(body: Value) -> Fields {
    body.as_object().cloned().unwrap_or_default()
  }

  #[tokio::test]
  async fn update_merges_and_missing_document_is_not_found() {
    let store = MemoryStore::new();
    let id = store
      .create(&Collection::Products, fields(json!({"title": "Tractor", "views": 2})))
      .await
      .unwrap();
    store
      .update(&Collection::Products, &id, fields(json!({"status": "APPROVED"})))
      .await
      .unwrap();
    let doc = store.get(&Collection::Products, &id).await.unwrap().unwrap();
    assert_eq!(doc.field("title"), Some(&json!("Tractor")));
    assert_eq!(doc.field("status"), Some(&json!("APPROVED")));

    let missing = store
      .update(&Collection::Products, "nope", fields(json!({"a": 1})))
      .await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
  }

  #[tokio::test]
  async fn watcher_sees_initial_and_changed_results_until_cancelled() {
    let store = MemoryStore::new();
    let deliveries = Arc::new(AtomicUsize::new(0));
    let last_len = Arc::new(AtomicUsize::new(usize::MAX));
    let (d, l) = (deliveries.clone(), last_len.clone());
    let sub = store
      .subscribe(
        &Collection::Sellers,
        &Query::all().where_eq("status", "PENDING"),
        Arc::new(move |docs| {
          d.fetch_add(1, Ordering::SeqCst);
          l.store(docs.len(), Ordering::SeqCst);
        }),
      )
      .await
      .unwrap();
    assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(last_len.load(Ordering::SeqCst), 0);

    store
      .create(&Collection::Sellers, fields(json!({"name": "Ravi", "status": "PENDING"})))
      .await
      .unwrap();
    assert_eq!(last_len.load(Ordering::SeqCst), 1);

    sub.unsubscribe();
    assert_eq!(store.watcher_count(), 0);
    store
      .create(&Collection::Sellers, fields(json!({"name": "Asha", "status": "PENDING"})))
      .await
      .unwrap();
    assert_eq!(deliveries.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn injected_faults_fail_the_targeted_calls_only() {
    let store = MemoryStore::new();
    store.seed(&Collection::Products, "p1", fields(json!({"views": 0})));
    store.seed(&Collection::Products, "p2", fields(json!({"views": 0})));
    store.fail_writes_to(["p1"]);

    assert!(store.increment(&Collection::Products, "p1", "views", 1).await.is_err());
    store.increment(&Collection::Products, "p2", "views", 1).await.unwrap();

    store.deny_subscriptions(&Collection::Enquiries);
    let denied = store
      .subscribe(&Collection::Enquiries, &Query::all(), Arc::new(|_| {}))
      .await;
    assert!(matches!(denied, Err(StoreError::PermissionDenied { .. })));

    store.set_offline(true);
    assert!(store.query(&Collection::Products, &Query::all()).await.is_err());
    store.clear_faults();
    assert_eq!(store.query(&Collection::Products, &Query::all()).await.unwrap().len(), 2);
  }
}
