// mandi/src/comparison.rs

//! The session-local comparison shortlist.
//!
//! At most [`COMPARISON_CAPACITY`] products, all of one category. Every mutation runs
//! as one read-modify-write under the set's lock, so rapid concurrent `add` calls each
//! see the result of the previous one.
//!
//! Rejections are also kept as a transient notice for the UI. The notice expires after
//! the configured TTL whether or not anything else happens, and any new action or an
//! explicit dismissal clears it at once. Expiry is evaluated on read and raises no
//! event; a shell that renders on change should schedule a re-render at
//! [`ComparisonSet::notice_deadline`].

use crate::error::ComparisonError;
use crate::model::{Category, Product};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

pub const COMPARISON_CAPACITY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
  /// `false` when the call toggled an existing entry out.
  pub added: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Notice {
  error: ComparisonError,
  raised_at: Instant,
}

#[derive(Debug, Default)]
struct Shortlist {
  items: Vec<Product>,
  notice: Option<Notice>,
}

#[derive(Debug)]
pub struct ComparisonSet {
  state: Mutex<Shortlist>,
  notice_ttl: Duration,
}

impl ComparisonSet {
  pub fn new(notice_ttl: Duration) -> Self {
    Self {
      state: Mutex::new(Shortlist::default()),
      notice_ttl,
    }
  }

  /// Toggles `product` into or out of the shortlist.
  ///
  /// - already present (by id): removed, `added = false`
  /// - shortlist full: `ComparisonError::Full`, unchanged
  /// - different category from the first entry: `ComparisonError::CategoryMismatch`, unchanged
  /// - otherwise appended, `added = true`
  pub fn add(&self, product: &Product) -> Result<AddOutcome, ComparisonError> {
    self.add_at(product, Instant::now())
  }

  pub fn add_at(&self, product: &Product, now: Instant) -> Result<AddOutcome, ComparisonError> {
    let mut state = self.state.lock();
    state.notice = None;

    if let Some(pos) = state.items.iter().position(|p| p.id == product.id) {
      state.items.remove(pos);
      debug!(product_id = %product.id, "Comparison entry toggled off.");
      return Ok(AddOutcome { added: false });
    }

    let rejection = if state.items.len() >= COMPARISON_CAPACITY {
      Some(ComparisonError::Full {
        capacity: COMPARISON_CAPACITY,
      })
    } else {
      state
        .items
        .first()
        .filter(|first| first.category != product.category)
        .map(|first| ComparisonError::CategoryMismatch {
          existing: first.category,
          attempted: product.category,
        })
    };

    if let Some(error) = rejection {
      debug!(product_id = %product.id, %error, "Comparison add rejected.");
      state.notice = Some(Notice {
        error: error.clone(),
        raised_at: now,
      });
      return Err(error);
    }

    state.items.push(product.clone());
    Ok(AddOutcome { added: true })
  }

  pub fn remove(&self, product_id: &str) {
    let mut state = self.state.lock();
    state.notice = None;
    state.items.retain(|p| p.id != product_id);
  }

  pub fn clear(&self) {
    let mut state = self.state.lock();
    state.notice = None;
    state.items.clear();
  }

  pub fn items(&self) -> Vec<Product> {
    self.state.lock().items.clone()
  }

  pub fn ids(&self) -> Vec<String> {
    self.state.lock().items.iter().map(|p| p.id.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.state.lock().items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, product_id: &str) -> bool {
    self.state.lock().items.iter().any(|p| p.id == product_id)
  }

  /// The category every entry shares, if any.
  pub fn category(&self) -> Option<Category> {
    self.state.lock().items.first().map(|p| p.category)
  }

  /// The live rejection notice, if one was raised less than the TTL ago.
  pub fn notice(&self) -> Option<ComparisonError> {
    self.notice_at(Instant::now())
  }

  pub fn notice_at(&self, now: Instant) -> Option<ComparisonError> {
    let mut state = self.state.lock();
    let expired = state
      .notice
      .as_ref()
      .is_some_and(|n| now.saturating_duration_since(n.raised_at) >= self.notice_ttl);
    if expired {
      state.notice = None;
    }
    state.notice.as_ref().map(|n| n.error.clone())
  }

  /// When the live notice lapses, or `None` if there is no notice.
  pub fn notice_deadline(&self) -> Option<Instant> {
    self
      .state
      .lock()
      .notice
      .as_ref()
      .map(|n| n.raised_at + self.notice_ttl)
  }

  pub fn dismiss_notice(&self) {
    self.state.lock().notice = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Condition, Location, ModerationStatus, SellerTrust, UsedDetails};
  use proptest::prelude::*;

  fn product(id: &str, category: Category) -> Product {
    Product {
      id: id.to_string(),
      title: id.to_string(),
      price: 1000.0,
      category,
      condition: Condition::New,
      description: String::new(),
      location: Location::default(),
      images: Vec::new(),
      seller_id: "s1".to_string(),
      seller_name: String::new(),
      moderation_status: ModerationStatus::Approved,
      seller_trust: SellerTrust::Verified,
      admin_origin: false,
      is_featured: false,
      views: 0,
      created_at: None,
      updated_at: None,
      used: UsedDetails::default(),
    }
  }

  fn set() -> ComparisonSet {
    ComparisonSet::new(Duration::from_secs(4))
  }

  #[test]
  fn adding_twice_toggles_out() {
    let s = set();
    let car = product("car-a", Category::Cars);
    assert_eq!(s.add(&car), Ok(AddOutcome { added: true }));
    assert_eq!(s.add(&car), Ok(AddOutcome { added: false }));
    assert!(s.is_empty());
  }

  #[test]
  fn fourth_product_is_rejected_and_set_unchanged() {
    let s = set();
    for id in ["a", "b", "c"] {
      s.add(&product(id, Category::Cars)).unwrap();
    }
    let err = s.add(&product("d", Category::Cars)).unwrap_err();
    assert_eq!(err, ComparisonError::Full { capacity: 3 });
    assert_eq!(s.ids(), vec!["a", "b", "c"]);
  }

  #[test]
  fn toggle_off_still_works_when_full() {
    let s = set();
    for id in ["a", "b", "c"] {
      s.add(&product(id, Category::Cars)).unwrap();
    }
    assert_eq!(s.add(&product("b", Category::Cars)), Ok(AddOutcome { added: false }));
    assert_eq!(s.ids(), vec!["a", "c"]);
  }

  #[test]
  fn category_mismatch_names_both_categories() {
    let s = set();
    s.add(&product("car", Category::Cars)).unwrap();
    let err = s.add(&product("bike", Category::Bikes)).unwrap_err();
    assert_eq!(
      err,
      ComparisonError::CategoryMismatch {
        existing: Category::Cars,
        attempted: Category::Bikes
      }
    );
    let msg = err.to_string();
    assert!(msg.contains("Bikes") && msg.contains("Cars"));
    assert_eq!(s.ids(), vec!["car"]);
  }

  #[test]
  fn notice_expires_after_ttl_and_clears_on_next_action() {
    let s = set();
    let t0 = Instant::now();
    s.add_at(&product("car", Category::Cars), t0).unwrap();
    s.add_at(&product("phone", Category::Mobiles), t0).unwrap_err();

    assert!(s.notice_at(t0 + Duration::from_millis(3999)).is_some());
    assert!(s.notice_at(t0 + Duration::from_secs(4)).is_none());

    s.add_at(&product("phone", Category::Mobiles), t0).unwrap_err();
    assert!(s.notice_at(t0).is_some());
    s.remove("nothing-here");
    assert!(s.notice_at(t0).is_none());

    s.add_at(&product("phone", Category::Mobiles), t0).unwrap_err();
    s.dismiss_notice();
    assert!(s.notice_at(t0).is_none());
  }

  #[test]
  fn deadline_tracks_the_live_notice() {
    let s = set();
    let t0 = Instant::now();
    assert_eq!(s.notice_deadline(), None);

    s.add_at(&product("car", Category::Cars), t0).unwrap();
    s.add_at(&product("phone", Category::Mobiles), t0).unwrap_err();
    let deadline = s.notice_deadline().unwrap();
    assert_eq!(deadline, t0 + Duration::from_secs(4));
    assert!(s.notice_at(deadline).is_none());
    assert_eq!(s.notice_deadline(), None);
  }

  #[derive(Debug, Clone)]
  enum Op {
    Add(u8),
    Remove(u8),
    Clear,
  }

  fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
      6 => (0u8..8).prop_map(Op::Add),
      2 => (0u8..8).prop_map(Op::Remove),
      1 => Just(Op::Clear),
    ]
  }

  proptest! {
    #[test]
    fn shortlist_stays_bounded_and_homogeneous(ops in proptest::collection::vec(op(), 0..64)) {
      let s = set();
      let categories = [Category::Cars, Category::Mobiles, Category::Bikes];
      for op in ops {
        match op {
          // An id always maps to the same category, as real listings do.
          Op::Add(id) => {
            let cat = categories[(id % 3) as usize];
            let _ = s.add(&product(&format!("p{}", id), cat));
          }
          Op::Remove(id) => s.remove(&format!("p{}", id)),
          Op::Clear => s.clear(),
        }
        let items = s.items();
        prop_assert!(items.len() <= COMPARISON_CAPACITY);
        if let Some(first) = items.first() {
          prop_assert!(items.iter().all(|p| p.category == first.category));
        }
      }
    }
  }
}
