// mandi/src/visibility.rs

//! Whether a listing may be shown to an unprivileged viewer.

use crate::model::{Identity, ModerationStatus, Product, SellerTrust};

/// Admin-origin listings are always public. Any other listing is public only when
/// approved and its seller-trust snapshot is not `Blocked`.
pub fn is_publicly_visible(product: &Product) -> bool {
  is_visible(product.admin_origin, product.moderation_status, product.seller_trust)
}

pub fn is_visible(admin_origin: bool, status: ModerationStatus, trust: SellerTrust) -> bool {
  admin_origin || (status == ModerationStatus::Approved && trust != SellerTrust::Blocked)
}

/// Admins see every moderation state; everyone else goes through the policy.
pub fn is_visible_to(viewer: &Identity, product: &Product) -> bool {
  viewer.is_admin() || is_publicly_visible(product)
}
