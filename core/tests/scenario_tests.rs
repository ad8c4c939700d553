// tests/scenario_tests.rs
mod common;

use common::*;
use mandi::{
  create_listing, set_product_status, BrowsingSession, Category, ComparisonError, Condition, Discovery,
  DiscoveryFilters, Identity, ListingDraft, Location, MandiConfig, MandiError, MemoryStore, ModerationStatus,
  SellerTrust, UsedDetails,
};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn pending_listing_appears_once_approved() {
  setup_tracing();
  let store = MemoryStore::new();
  seed_product(&store, &listing("older", Category::Cars, "Delhi", 1));
  seed_product(
    &store,
    &with_state(
      listing("P1", Category::Cars, "Delhi", 2),
      ModerationStatus::Pending,
      SellerTrust::Verified,
      false,
    ),
  );
  let discovery = Discovery::new(Arc::new(store.clone()), MandiConfig::default());

  let before = discovery.discover(DiscoveryFilters::new()).await.unwrap();
  assert_eq!(ids(&before), vec!["older"]);

  set_product_status(&store, &Identity::admin("admin-1"), "P1", ModerationStatus::Approved)
    .await
    .unwrap();

  let after = discovery.discover(DiscoveryFilters::new()).await.unwrap();
  assert_eq!(ids(&after), vec!["P1", "older"]);
}

#[tokio::test]
#[serial]
async fn seller_listing_goes_live_through_moderation() {
  setup_tracing();
  let store = MemoryStore::new();
  let discovery = Discovery::new(Arc::new(store.clone()), MandiConfig::default());
  let draft = ListingDraft {
    title: "Mahindra 575 DI tractor".to_string(),
    price: 450_000.0,
    category: Category::Agriproducts,
    condition: Condition::Used,
    description: "Well kept".to_string(),
    location: Location::new("Nashik", "Maharashtra"),
    used: UsedDetails {
      year_of_purchase: Some(2019),
      usage: Some("2000 hours".to_string()),
      owners_count: Some("1".to_string()),
    },
    seller_name: Some("Patil Farms".to_string()),
  };

  let id = create_listing(&store, &Identity::seller("patil"), draft, vec![])
    .await
    .unwrap();
  assert!(discovery.discover(DiscoveryFilters::new()).await.unwrap().is_empty());

  set_product_status(&store, &Identity::admin("admin-1"), &id, ModerationStatus::Approved)
    .await
    .unwrap();
  let live = discovery
    .discover(DiscoveryFilters::new().category(Category::Agriproducts).city("Nashik"))
    .await
    .unwrap();
  assert_eq!(live.len(), 1);
  assert_eq!(live[0].id, id);
  assert_eq!(live[0].used.owners_count.as_deref(), Some("1"));
}

#[test]
fn comparison_walkthrough() {
  let session = BrowsingSession::start(Identity::buyer("b1"), MandiConfig::default());
  let compare = session.comparison();
  let car_a = listing("CarA", Category::Cars, "Delhi", 1);
  let car_b = listing("CarB", Category::Cars, "Delhi", 2);
  let phone_c = listing("PhoneC", Category::Mobiles, "Delhi", 3);
  let car_c = listing("CarC", Category::Cars, "Delhi", 4);
  let car_d = listing("CarD", Category::Cars, "Delhi", 5);

  assert!(compare.add(&car_a).unwrap().added);
  assert!(compare.add(&car_b).unwrap().added);

  let err = compare.add(&phone_c).unwrap_err();
  assert_eq!(
    err,
    ComparisonError::CategoryMismatch {
      existing: Category::Cars,
      attempted: Category::Mobiles
    }
  );
  assert_eq!(compare.ids(), vec!["CarA", "CarB"]);
  assert_eq!(compare.notice(), Some(err));

  assert!(compare.add(&car_c).unwrap().added);
  assert_eq!(compare.notice(), None);
  assert_eq!(compare.ids(), vec!["CarA", "CarB", "CarC"]);

  let full: MandiError = compare.add(&car_d).unwrap_err().into();
  assert!(matches!(full, MandiError::ComparisonFull { capacity: 3 }));
  assert!(full.is_transient());
  assert_eq!(compare.ids(), vec!["CarA", "CarB", "CarC"]);

  session.end();
}
