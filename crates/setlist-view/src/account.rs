//! Sign-in mirroring and group membership.

use setlist_core::{
  activity::{ActivityKind, NewActivity},
  group::Group,
  store::TrackStore,
  user::{Principal, User},
};
use tracing::info;
use uuid::Uuid;

use crate::{Dispatcher, Error, Result};

/// Mirror an authenticated principal into the store. A first sign-in creates
/// the user with the default role; later sign-ins refresh the profile fields
/// the principal carries and keep the stored role.
pub async fn sign_in<S: TrackStore>(store: &S, principal: &Principal) -> Result<User> {
  let existing = store.get_user(&principal.user_id).await.map_err(Error::store)?;
  let user = match existing {
    None => {
      info!(user_id = %principal.user_id, "first sign-in");
      User::from_principal(principal)
    }
    Some(mut user) => {
      if let Some(name) = principal.display_name.as_ref().filter(|n| !n.is_empty()) {
        user.display_name = name.clone();
      }
      if let Some(email) = principal.email.as_ref().filter(|e| !e.is_empty()) {
        user.email = email.clone();
      }
      user
    }
  };
  store.put_user(user).await.map_err(Error::store)
}

impl<S: TrackStore> Dispatcher<S> {
  /// Create a group administered by the acting user.
  pub async fn create_group(&self, name: &str) -> Result<Group> {
    let actor = self.actor()?;
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::Validation("Group name cannot be empty.".to_owned()));
    }
    let group = self
      .store()
      .create_group(name.to_owned(), actor.user_id.clone())
      .await
      .map_err(Error::store)?;
    info!(group_id = %group.group_id, "group created");
    Ok(group)
  }

  /// Join a group by id. Joining a group twice is a no-op.
  pub async fn join_group(&self, group_id: Uuid) -> Result<Group> {
    let actor = self.actor()?;
    let existing = self
      .store()
      .get_group(group_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::GroupNotFound(group_id))?;
    if existing.is_member(&actor.user_id) {
      return Ok(existing);
    }

    let group = self
      .store()
      .join_group(group_id, actor.user_id.clone())
      .await
      .map_err(Error::store)?;
    info!(%group_id, user_id = %actor.user_id, "joined group");
    self
      .log(NewActivity::new(
        group_id,
        ActivityKind::UserJoinedGroup,
        actor.user_id.clone(),
        &actor.display_name,
      ))
      .await;
    Ok(group)
  }

  /// Groups the acting user belongs to.
  pub async fn my_groups(&self) -> Result<Vec<Group>> {
    let actor = self.actor()?;
    self
      .store()
      .groups_for_user(&actor.user_id)
      .await
      .map_err(Error::store)
  }
}
