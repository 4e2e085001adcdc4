//! Live queries over the store, driven by a broadcast change bus.

use std::future::Future;

use setlist_core::subscription::{self, Disposer, Subscription};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{Error, Result};

/// Buffer capacity for the change bus. A subscriber that falls further behind
/// than this simply re-reads its scope.
const CHANGE_CAPACITY: usize = 256;

/// A scope touched by a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
  /// The track list of a group.
  Tracks(Uuid),
  /// The rating sub-collection of a track.
  Ratings(Uuid),
}

/// In-process fan-out of [`Change`] announcements.
#[derive(Clone)]
pub struct ChangeBus {
  sender: broadcast::Sender<Change>,
}

impl ChangeBus {
  pub fn new() -> Self {
    let (sender, _) = broadcast::channel(CHANGE_CAPACITY);
    Self { sender }
  }

  /// Announce a change. Silently dropped when nobody is listening.
  pub fn publish(&self, change: Change) { let _ = self.sender.send(change); }

  pub fn subscribe(&self) -> broadcast::Receiver<Change> { self.sender.subscribe() }

  /// Number of live receivers, one per running live query.
  pub fn listeners(&self) -> usize { self.sender.receiver_count() }
}

impl Default for ChangeBus {
  fn default() -> Self { Self::new() }
}

/// Spawn a task that runs `query` once, then again after every change
/// announced for `scope`, pushing each result as a snapshot. The first
/// failed query ends the subscription. Disposing the subscription aborts the
/// task.
pub fn spawn_live<T, Q, Fut>(
  bus: &ChangeBus,
  scope: Change,
  query: Q,
) -> Subscription<T, Error>
where
  T: Send + 'static,
  Q: Fn() -> Fut + Send + 'static,
  Fut: Future<Output = Result<T>> + Send + 'static,
{
  // Subscribe before the first read so no change can slip in between.
  let mut changes = bus.subscribe();
  let (mut publisher, sub) = subscription::channel();

  let handle = tokio::spawn(async move {
    loop {
      match query().await {
        Ok(data) => {
          if !publisher.publish(data) {
            return;
          }
        }
        Err(e) => {
          tracing::warn!(?scope, error = %e, "live query failed");
          publisher.fail(e);
          return;
        }
      }

      loop {
        match changes.recv().await {
          Ok(change) if change == scope => break,
          Ok(_) => continue,
          Err(RecvError::Lagged(skipped)) => {
            tracing::debug!(?scope, skipped, "change bus lagged; re-reading");
            break;
          }
          Err(RecvError::Closed) => return,
        }
      }
    }
  });

  sub.with_disposer(Disposer::new(move || handle.abort()))
}
