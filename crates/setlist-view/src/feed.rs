//! Forwarding of live-query deliveries into the table's single inbox.
//!
//! Each subscription gets a forwarding task that tags every delivery with the
//! epoch it was opened under. The table drops deliveries whose epoch is no
//! longer current, so a late push from a torn-down subscription can never
//! overwrite newer state.

use setlist_core::{
  rating::Rating,
  subscription::{Delivery, Subscription},
  track::Track,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::trace;
use uuid::Uuid;

use crate::error::BoxError;

/// One tagged delivery, as seen by the table.
#[derive(Debug)]
pub enum Inbound {
  Tracks {
    epoch:    u64,
    delivery: Delivery<Vec<Track>, BoxError>,
  },
  Ratings {
    track_id: Uuid,
    epoch:    u64,
    delivery: Delivery<Vec<Rating>, BoxError>,
  },
}

pub type Inbox = mpsc::UnboundedSender<Inbound>;

/// Owns a forwarding task. Dropping the link aborts the task, which drops the
/// subscription and runs its disposer.
#[derive(Debug)]
pub struct Link {
  task: JoinHandle<()>,
}

impl Link {
  pub fn is_finished(&self) -> bool { self.task.is_finished() }
}

impl Drop for Link {
  fn drop(&mut self) { self.task.abort(); }
}

/// Spawn a task pumping `sub` into `inbox` through `tag`. The task ends after
/// forwarding an error, or when the inbox is gone.
pub fn forward<T, E, F>(mut sub: Subscription<T, E>, inbox: Inbox, tag: F) -> Link
where
  T: Send + 'static,
  E: std::error::Error + Send + Sync + 'static,
  F: Fn(Delivery<T, BoxError>) -> Inbound + Send + 'static,
{
  let task = tokio::spawn(async move {
    while let Some(delivery) = sub.next().await {
      let failed = delivery.is_err();
      let delivery = delivery.map_err(|e| Box::new(e) as BoxError);
      if inbox.send(tag(delivery)).is_err() || failed {
        break;
      }
    }
    trace!("live query forwarder finished");
    sub.dispose();
  });
  Link { task }
}
