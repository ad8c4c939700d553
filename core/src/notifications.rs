// mandi/src/notifications.rs

//! Merged live notification feed for admins and sellers.
//!
//! An admin watches three sub-feeds (sellers awaiting verification, products awaiting
//! moderation, unread enquiries); a seller watches the enquiries addressed to them.
//! Each sub-feed owns one slot of a fixed table. Any delivery replaces that slot and
//! rebuilds the merged view from every slot, newest first.
//!
//! A sub-feed that cannot attach is logged and stays empty for the life of the
//! aggregator; the others keep working.
//!
//! Lock order: the store's delivery lock, then the aggregator gate. `unsubscribe_all`
//! closes the gate and releases it before cancelling store subscriptions, so the two
//! are never taken in the opposite order.

use crate::error::{MandiError, Result};
use crate::model::{Identity, Role};
use crate::store::{ChangeCallback, Collection, Document, Query, RecordStore, Subscription};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

const SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
  PendingSellers,
  PendingProducts,
  UnreadEnquiries,
  SellerEnquiries,
}

impl Feed {
  pub const ADMIN: [Feed; 3] = [Feed::PendingSellers, Feed::PendingProducts, Feed::UnreadEnquiries];

  pub fn name(self) -> &'static str {
    match self {
      Feed::PendingSellers => "pending_sellers",
      Feed::PendingProducts => "pending_products",
      Feed::UnreadEnquiries => "unread_enquiries",
      Feed::SellerEnquiries => "seller_enquiries",
    }
  }

  fn slot(self) -> usize {
    match self {
      Feed::PendingSellers | Feed::SellerEnquiries => 0,
      Feed::PendingProducts => 1,
      Feed::UnreadEnquiries => 2,
    }
  }

  fn collection(self) -> Collection {
    match self {
      Feed::PendingSellers => Collection::Sellers,
      Feed::PendingProducts => Collection::Products,
      Feed::UnreadEnquiries | Feed::SellerEnquiries => Collection::Enquiries,
    }
  }

  fn query(self, user_id: &str) -> Query {
    match self {
      Feed::PendingSellers | Feed::PendingProducts => Query::all().where_eq("status", "PENDING"),
      Feed::UnreadEnquiries => Query::all().where_eq("adminRead", false),
      Feed::SellerEnquiries => Query::all().where_eq("sellerId", user_id),
    }
  }

  fn notification(self, doc: &Document) -> Notification {
    let text = |path: &str| doc.field(path).and_then(Value::as_str).unwrap_or_default().to_string();
    let (title, subtitle, link) = match self {
      Feed::PendingSellers => (
        "New Seller",
        text("name"),
        format!("/admin?tab=sellers&highlight={}", doc.id),
      ),
      Feed::PendingProducts => (
        "Product Approval",
        text("title"),
        format!("/admin?tab=products&highlight={}", doc.id),
      ),
      Feed::UnreadEnquiries => (
        "New Enquiry",
        text("productName"),
        format!("/admin?tab=enquiries&highlight={}", doc.id),
      ),
      Feed::SellerEnquiries => (
        "New Enquiry",
        text("customerName"),
        format!("/seller/dashboard?tab=enquiries&highlight={}", doc.id),
      ),
    };
    Notification {
      id: doc.id.clone(),
      feed: self,
      title: title.to_string(),
      subtitle,
      link,
      time: doc
        .field("createdAt")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc)),
    }
  }
}

impl fmt::Display for Feed {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub id: String,
  pub feed: Feed,
  pub title: String,
  pub subtitle: String,
  /// In-app route that opens the underlying record.
  pub link: String,
  pub time: Option<DateTime<Utc>>,
}

/// Called with the full merged view after every change.
pub type NotificationListener = Arc<dyn Fn(&[Notification]) + Send + Sync + 'static>;

struct Shared {
  // `true` while deliveries may reach the listener.
  gate: ReentrantMutex<Cell<bool>>,
  slots: Mutex<[Vec<Notification>; SLOTS]>,
  merged: Mutex<Vec<Notification>>,
  listener: NotificationListener,
}

impl Shared {
  fn deliver(&self, feed: Feed, docs: Vec<Document>) {
    let gate = self.gate.lock();
    if !gate.get() {
      trace!(feed = %feed, "Delivery after unsubscribe dropped.");
      return;
    }

    let merged = {
      let mut slots = self.slots.lock();
      slots[feed.slot()] = docs.iter().map(|doc| feed.notification(doc)).collect();
      let mut merged: Vec<Notification> = slots.iter().flatten().cloned().collect();
      // Stable; an item without a time orders after every timed one.
      merged.sort_by(|a, b| b.time.cmp(&a.time));
      merged
    };
    debug!(feed = %feed, total = merged.len(), "Notifications recombined.");
    *self.merged.lock() = merged.clone();
    (self.listener)(&merged);
    drop(gate);
  }
}

pub struct NotificationAggregator {
  shared: Arc<Shared>,
  feeds: Vec<Feed>,
  subscriptions: Mutex<Vec<Subscription>>,
  failures: Vec<MandiError>,
}

impl NotificationAggregator {
  /// Attaches every sub-feed the identity's role is entitled to, concurrently.
  ///
  /// Admins get the three moderation feeds, sellers their own enquiries. Anyone else
  /// is refused. Sub-feeds that fail to attach are recorded in [`failures`] instead of
  /// failing the whole aggregator.
  ///
  /// [`failures`]: NotificationAggregator::failures
  #[instrument(name = "NotificationAggregator::attach", skip(store, identity, listener), err(Display))]
  pub async fn attach(
    store: &dyn RecordStore,
    identity: &Identity,
    listener: impl Fn(&[Notification]) + Send + Sync + 'static,
  ) -> Result<Self> {
    let user_id = identity.require_user("notifications")?;
    let feeds: Vec<Feed> = match identity.role {
      Role::Admin => Feed::ADMIN.to_vec(),
      Role::Seller => vec![Feed::SellerEnquiries],
      _ => return Err(MandiError::Forbidden { operation: "notifications" }),
    };

    let shared = Arc::new(Shared {
      gate: ReentrantMutex::new(Cell::new(true)),
      slots: Mutex::new(Default::default()),
      merged: Mutex::new(Vec::new()),
      listener: Arc::new(listener),
    });

    let targets: Vec<(Feed, Collection, Query)> = feeds
      .iter()
      .map(|&feed| (feed, feed.collection(), feed.query(user_id)))
      .collect();
    let attempts = join_all(targets.iter().map(|(feed, collection, query)| {
      let feed = *feed;
      let sink = shared.clone();
      let callback: ChangeCallback = Arc::new(move |docs| sink.deliver(feed, docs));
      store.subscribe(collection, query, callback)
    }))
    .await;

    let mut subscriptions = Vec::with_capacity(feeds.len());
    let mut failures = Vec::new();
    for (&feed, attempt) in feeds.iter().zip(attempts) {
      match attempt {
        Ok(subscription) => subscriptions.push(subscription),
        Err(source) => {
          warn!(feed = %feed, error = %source, "Notification feed failed to attach; left empty.");
          failures.push(MandiError::SubscriptionFailed {
            feed: feed.name(),
            source,
          });
        }
      }
    }
    info!(attached = subscriptions.len(), failed = failures.len(), "Notification feeds attached.");

    Ok(Self {
      shared,
      feeds,
      subscriptions: Mutex::new(subscriptions),
      failures,
    })
  }

  /// The current merged view, newest first.
  pub fn notifications(&self) -> Vec<Notification> {
    self.shared.merged.lock().clone()
  }

  pub fn len(&self) -> usize {
    self.shared.merged.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn feeds(&self) -> &[Feed] {
    &self.feeds
  }

  /// Sub-feeds that could not attach, as `SubscriptionFailed` errors.
  pub fn failures(&self) -> &[MandiError] {
    &self.failures
  }

  pub fn is_live(&self) -> bool {
    self.shared.gate.lock().get()
  }

  /// Stops every delivery and releases all store subscriptions. Once this returns the
  /// listener is never called again. Calling it twice is harmless.
  pub fn unsubscribe_all(&self) {
    {
      let gate = self.shared.gate.lock();
      gate.set(false);
    }
    let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
    let released = subscriptions.len();
    for subscription in subscriptions {
      subscription.unsubscribe();
    }
    if released > 0 {
      debug!(released, "Notification feeds released.");
    }
  }
}

impl Drop for NotificationAggregator {
  fn drop(&mut self) {
    self.unsubscribe_all();
  }
}

impl fmt::Debug for NotificationAggregator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NotificationAggregator")
      .field("feeds", &self.feeds)
      .field("live", &self.is_live())
      .field("failures", &self.failures.len())
      .finish()
  }
}
