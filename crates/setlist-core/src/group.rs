//! Groups, the boundary that partitions tracks and membership.
//!
//! A group's identifier doubles as its invite token: anyone who knows it can
//! join, with no approval step.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub group_id:   Uuid,
  pub name:       String,
  /// The creating user.
  pub admin_id:   UserId,
  pub members:    BTreeSet<UserId>,
  pub created_at: DateTime<Utc>,
}

impl Group {
  pub fn is_member(&self, user_id: &UserId) -> bool { self.members.contains(user_id) }
}
