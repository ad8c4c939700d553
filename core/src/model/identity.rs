// mandi/src/model/identity.rs

//! The viewer identity handed in by the auth collaborator.

use crate::error::{MandiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
  #[default]
  None,
  Buyer,
  Seller,
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
  pub user_id: Option<String>,
  pub role: Role,
}

impl Identity {
  pub fn anonymous() -> Self {
    Self::default()
  }

  pub fn buyer(user_id: impl Into<String>) -> Self {
    Self::with_role(user_id, Role::Buyer)
  }

  pub fn seller(user_id: impl Into<String>) -> Self {
    Self::with_role(user_id, Role::Seller)
  }

  pub fn admin(user_id: impl Into<String>) -> Self {
    Self::with_role(user_id, Role::Admin)
  }

  fn with_role(user_id: impl Into<String>, role: Role) -> Self {
    Self {
      user_id: Some(user_id.into()),
      role,
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin && self.user_id.is_some()
  }

  /// The user id, or `NotAuthenticated` when absent or blank.
  pub fn require_user(&self, operation: &'static str) -> Result<&str> {
    match self.user_id.as_deref() {
      Some(id) if !id.trim().is_empty() => Ok(id),
      _ => Err(MandiError::NotAuthenticated { operation }),
    }
  }

  pub fn require_admin(&self, operation: &'static str) -> Result<&str> {
    let id = self.require_user(operation)?;
    if self.role == Role::Admin {
      Ok(id)
    } else {
      Err(MandiError::Forbidden { operation })
    }
  }

  pub fn require_seller_or_admin(&self, operation: &'static str) -> Result<&str> {
    let id = self.require_user(operation)?;
    match self.role {
      Role::Seller | Role::Admin => Ok(id),
      _ => Err(MandiError::Forbidden { operation }),
    }
  }
}
