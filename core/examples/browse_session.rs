// mandi/examples/browse_session.rs
//
// Walks one marketplace day against the in-memory store: a seller lists, the admin
// watches the moderation queue, approves, and a buyer browses, compares and saves.

use mandi::{
  create_listing, set_product_status, submit_enquiry, BrowsingSession, Category, Condition, Discovery,
  DiscoveryFilters, EnquiryDraft, Identity, ListingDraft, Location, MandiConfig, MandiError, MemoryStore,
  ModerationStatus, Notification, NotificationAggregator, UsedDetails, Wishlist,
};
use std::sync::Arc;
use tracing::{info, warn};

fn car(title: &str, city: &str) -> ListingDraft {
  ListingDraft {
    title: title.to_string(),
    price: 550_000.0,
    category: Category::Cars,
    condition: Condition::Used,
    description: "Single owner, serviced on time".to_string(),
    location: Location::new(city, ""),
    used: UsedDetails {
      year_of_purchase: Some(2019),
      usage: Some("42,000 km".to_string()),
      owners_count: Some("1".to_string()),
    },
    seller_name: Some("Sharma Motors".to_string()),
  }
}

#[tokio::main]
async fn main() -> Result<(), MandiError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  let config = MandiConfig::from_env()?;
  let store = MemoryStore::new();
  let discovery = Discovery::new(Arc::new(store.clone()), config.clone());
  let admin = Identity::admin("admin-1");
  let seller = Identity::seller("sharma");
  let buyer = Identity::buyer("meera");

  let queue = NotificationAggregator::attach(&store, &admin, |items: &[Notification]| {
    info!(pending = items.len(), "Admin queue changed.");
  })
  .await?;

  let mut listed = Vec::new();
  for (title, city) in [("Swift VXI", "Jaipur"), ("Baleno Zeta", "Jaipur"), ("City ZX", "Pune")] {
    listed.push(create_listing(&store, &seller, car(title, city), Vec::new()).await?);
  }
  info!(visible = discovery.discover(DiscoveryFilters::new()).await?.len(), "Before moderation.");

  for id in &listed {
    set_product_status(&store, &admin, id, ModerationStatus::Approved).await?;
  }

  let session = BrowsingSession::start(buyer.clone(), config);
  session.set_location("Jaipur");
  let feed = discovery.discover(session.filters()).await?;
  info!(location = %session.location(), results = feed.len(), "Buyer feed.");

  for product in &feed {
    session.record_view(&store, product).await?;
    if let Err(rejected) = session.comparison().add(product) {
      warn!(%rejected, "Comparison refused.");
    }
  }
  info!(comparing = ?session.comparison().ids(), "Comparison shortlist.");

  let wishlist = Wishlist::new(Arc::new(store.clone()));
  if let Some(first) = feed.first() {
    wishlist.add(&buyer, first).await?;
    submit_enquiry(&store, &buyer, first, EnquiryDraft::default()).await?;
  }
  info!(saved = wishlist.list(&buyer).await?.len(), "Wishlist.");
  info!(notifications = queue.len(), "Admin sees the new enquiry.");

  queue.unsubscribe_all();
  session.end();
  Ok(())
}
