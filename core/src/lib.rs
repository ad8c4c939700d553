// mandi/src/lib.rs

//! Mandi: the client-side discovery and list-consistency core of a classifieds
//! marketplace.
//!
//! The crate is a library consumed by a UI shell. It provides:
//!  - A single visibility policy shared by every public read path.
//!  - A staged discovery pipeline (fetch, visibility, category, city, search,
//!    recency, limit) built on a small async stage engine.
//!  - The persisted wishlist and the session-local comparison shortlist.
//!  - A merged live notification feed for admins and sellers.
//!  - Listing, enquiry and moderation operations, including the seller-trust cascade
//!    that keeps denormalised product snapshots consistent.
//!
//! Persistence goes through the [`RecordStore`] trait only; [`MemoryStore`] is the
//! in-process implementation.

pub mod comparison;
pub mod config;
pub mod core;
pub mod discovery;
pub mod enquiries;
pub mod error;
pub mod listings;
pub mod media;
pub mod model;
pub mod moderation;
pub mod notifications;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod visibility;
pub mod wishlist;

// --- Re-exports for the Public API ---

pub use crate::comparison::{AddOutcome, ComparisonSet, COMPARISON_CAPACITY};
pub use crate::config::MandiConfig;
pub use crate::core::{ContextData, PipelineOutcome, StageControl, StageDef};
pub use crate::discovery::{Discovery, DiscoveryFilters};
pub use crate::enquiries::{mark_enquiries_read, seller_enquiries, submit_enquiry, EnquiryDraft};
pub use crate::error::{ComparisonError, MandiError, PipelineError, Result, StoreError, StoreResult};
pub use crate::listings::{create_listing, fetch_product, seller_listings, update_listing, ListingDraft, ListingEdit};
pub use crate::media::{upload_images, ImageFile, ImageStorage};
pub use crate::model::{
  Category, Condition, Enquiry, Identity, Location, ModerationStatus, NewsItem, Product, Role, Seller, SellerTrust,
  UsedDetails,
};
pub use crate::moderation::{cascade_seller_trust, set_product_status, set_seller_status, CascadeReport};
pub use crate::notifications::{Feed, Notification, NotificationAggregator};
pub use crate::pipeline::Pipeline;
pub use crate::session::{BrowsingSession, ViewTracker};
pub use crate::store::{Collection, Document, MemoryStore, Query, RecordStore, Subscription};
pub use crate::visibility::{is_publicly_visible, is_visible_to};
pub use crate::wishlist::{Wishlist, WishlistEntry};
