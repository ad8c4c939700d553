// mandi/src/store/typed.rs

//! Typed accessors over the untyped document store.

use super::{Collection, Document, Fields, Query, RecordStore};
use crate::error::{MandiError, Result, StoreError, StoreResult};
use crate::model::{Enquiry, NewsItem, Product, Seller};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A document type whose id is held outside its stored fields.
pub trait Record: Serialize + DeserializeOwned + Send {
  fn assign_id(&mut self, id: String);
}

macro_rules! impl_record {
  ($($ty:ty),* $(,)?) => {
    $(impl Record for $ty {
      fn assign_id(&mut self, id: String) {
        self.id = id;
      }
    })*
  };
}

impl_record!(Product, Seller, Enquiry, NewsItem);

pub fn encode<T: Serialize>(record: &T) -> Result<Fields> {
  match serde_json::to_value(record) {
    Ok(Value::Object(fields)) => Ok(fields),
    Ok(other) => Err(MandiError::Validation(format!(
      "record did not serialise to an object: {}",
      other
    ))),
    Err(e) => Err(MandiError::Validation(format!("record failed to serialise: {}", e))),
  }
}

pub fn decode<T: Record>(collection: &Collection, doc: Document) -> Result<T> {
  let Document { id, fields } = doc;
  let mut record: T = serde_json::from_value(Value::Object(fields)).map_err(|source| MandiError::Decode {
    collection: collection.path(),
    id: id.clone(),
    source,
  })?;
  record.assign_id(id);
  Ok(record)
}

/// Decodes what it can and logs the rest. Used on read paths where one malformed
/// record must not blank a whole list.
pub fn decode_lenient<T: Record>(collection: &Collection, docs: Vec<Document>) -> Vec<T> {
  docs
    .into_iter()
    .filter_map(|doc| match decode::<T>(collection, doc) {
      Ok(record) => Some(record),
      Err(e) => {
        warn!(collection = %collection, error = %e, "Skipping undecodable record.");
        None
      }
    })
    .collect()
}

pub async fn fetch<T: Record>(store: &dyn RecordStore, collection: &Collection, id: &str) -> Result<Option<T>> {
  match store.get(collection, id).await.map_err(MandiError::store("fetch"))? {
    Some(doc) => decode(collection, doc).map(Some),
    None => Ok(None),
  }
}

pub async fn fetch_where<T: Record>(store: &dyn RecordStore, collection: &Collection, query: &Query) -> Result<Vec<T>> {
  let docs = store
    .query(collection, query)
    .await
    .map_err(MandiError::store("query"))?;
  docs.into_iter().map(|doc| decode(collection, doc)).collect()
}

/// Applies a caller-imposed timeout to a store call. Elapsing is reported as
/// `StoreError::Timeout` so it is handled exactly like any other fetch failure.
pub async fn within<T>(limit: Option<Duration>, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
  match limit {
    None => call.await,
    Some(limit) => tokio::time::timeout(limit, call)
      .await
      .unwrap_or_else(|_| Err(StoreError::Timeout { millis: limit.as_millis() })),
  }
}
