//! Users, roles, and the per-record authorization predicate.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::track::Track;

/// Opaque identifier issued by the external identity provider.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for UserId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Application role. `Admin` is the privileged role that bypasses per-record
/// ownership checks.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  User,
}

/// What the identity collaborator tells us about the signed-in principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub user_id:      UserId,
  pub display_name: Option<String>,
  pub email:        Option<String>,
}

/// A user record mirrored into application storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:      UserId,
  pub display_name: String,
  pub email:        String,
  pub role:         Role,
}

impl User {
  /// The record created on first sign-in: role defaults to [`Role::User`].
  pub fn from_principal(principal: &Principal) -> Self {
    let email = principal.email.clone().unwrap_or_default();
    let display_name = principal
      .display_name
      .clone()
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| {
        if email.is_empty() { "Anonymous".to_owned() } else { email.clone() }
      });
    Self {
      user_id: principal.user_id.clone(),
      display_name,
      email,
      role: Role::default(),
    }
  }

  pub fn is_privileged(&self) -> bool { self.role == Role::Admin }

  /// Whether this user may select or delete `track`: they added it, or they
  /// hold the privileged role.
  pub fn can_manage(&self, track: &Track) -> bool {
    self.is_privileged() || self.user_id == track.added_by_id
  }
}
