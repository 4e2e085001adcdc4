//! The explicit session context: who is acting, and which group is active.
//!
//! A [`Session`] is passed into the view layer when it is constructed rather
//! than read from ambient state, which keeps the derived view pure.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::User;

/// The fixed, read-only scope shown when no group is active.
pub const DEMO_GROUP_ID: Uuid = Uuid::from_u128(0x5e71_1570_de30_4000_8000_0000_0000_0001);

/// Which slice of the track collection a view subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "group_id", rename_all = "snake_case")]
pub enum Scope {
  Group(Uuid),
  Demo,
}

impl Scope {
  /// The group whose tracks back this scope.
  pub fn group_id(self) -> Uuid {
    match self {
      Self::Group(id) => id,
      Self::Demo => DEMO_GROUP_ID,
    }
  }

  pub fn is_demo(self) -> bool { matches!(self, Self::Demo) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
  user:         Option<User>,
  active_group: Option<Uuid>,
}

impl Session {
  /// No principal; ratings stay local and the demo scope is shown.
  pub fn anonymous() -> Self { Self::default() }

  pub fn signed_in(user: User) -> Self {
    Self { user: Some(user), active_group: None }
  }

  pub fn with_group(mut self, group_id: Option<Uuid>) -> Self {
    self.active_group = group_id;
    self
  }

  pub fn user(&self) -> Option<&User> { self.user.as_ref() }

  pub fn active_group(&self) -> Option<Uuid> { self.active_group }

  pub fn set_active_group(&mut self, group_id: Option<Uuid>) {
    self.active_group = group_id;
  }

  /// Drop the principal and the active group together.
  pub fn sign_out(&mut self) {
    self.user = None;
    self.active_group = None;
  }

  pub fn scope(&self) -> Scope {
    match self.active_group {
      Some(id) if self.user.is_some() => Scope::Group(id),
      _ => Scope::Demo,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::user::{Role, UserId};

  fn alice() -> User {
    User {
      user_id:      UserId::new("alice"),
      display_name: "Alice".into(),
      email:        "alice@example.com".into(),
      role:         Role::User,
    }
  }

  #[test]
  fn anonymous_session_is_demo() {
    assert_eq!(Session::anonymous().scope(), Scope::Demo);
    assert_eq!(Scope::Demo.group_id(), DEMO_GROUP_ID);
  }

  #[test]
  fn signed_in_without_group_is_demo() {
    assert_eq!(Session::signed_in(alice()).scope(), Scope::Demo);
  }

  #[test]
  fn active_group_scopes_the_view() {
    let g = Uuid::new_v4();
    let s = Session::signed_in(alice()).with_group(Some(g));
    assert_eq!(s.scope(), Scope::Group(g));
  }

  #[test]
  fn sign_out_clears_group() {
    let mut s = Session::signed_in(alice()).with_group(Some(Uuid::new_v4()));
    s.sign_out();
    assert!(s.user().is_none());
    assert_eq!(s.active_group(), None);
  }
}
