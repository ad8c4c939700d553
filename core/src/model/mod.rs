// mandi/src/model/mod.rs

//! Record shapes stored in the marketplace collections.
//!
//! Field names serialise in the camelCase document layout the record store holds.

pub mod enquiry;
pub mod identity;
mod loose;
pub mod news;
pub mod product;
pub mod seller;

pub use enquiry::Enquiry;
pub use identity::{Identity, Role};
pub use news::NewsItem;
pub use product::{Category, Condition, Location, ModerationStatus, Product, UsedDetails};
pub use seller::{Seller, SellerTrust};
