//! One live rating query per displayed track, reduced to a mean.

use std::collections::{HashMap, HashSet};

use setlist_core::{
  rating::{Rating, mean_score},
  store::TrackStore,
  subscription::Delivery,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  error::BoxError,
  feed::{Inbound, Inbox, Link, forward},
  pipeline::AggregateMap,
};

#[derive(Debug)]
struct Watch {
  epoch:  u64,
  /// Highest sequence number applied so far.
  seq:    Option<u64>,
  failed: bool,
  _link:  Link,
}

/// The outcome of applying one rating delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateChange {
  Updated(Option<f64>),
  Failed(String),
  Stale,
}

#[derive(Debug, Default)]
pub struct AggregateSet {
  watches:    HashMap<Uuid, Watch>,
  values:     AggregateMap,
  next_epoch: u64,
}

impl AggregateSet {
  pub fn values(&self) -> &AggregateMap { &self.values }

  pub fn get(&self, track_id: Uuid) -> Option<f64> {
    self.values.get(&track_id).copied().flatten()
  }

  /// Number of live rating queries currently held.
  pub fn watching(&self) -> usize { self.watches.len() }

  /// Every query has delivered its first snapshot or failed.
  pub fn is_settled(&self) -> bool {
    self.watches.values().all(|w| w.seq.is_some() || w.failed)
  }

  pub fn is_watching(&self, track_id: Uuid) -> bool { self.watches.contains_key(&track_id) }

  #[cfg(test)]
  pub(crate) fn epoch_of(&self, track_id: Uuid) -> Option<u64> {
    self.watches.get(&track_id).map(|w| w.epoch)
  }

  /// Make the watched set equal `present`: tear down queries for tracks that
  /// are gone, open queries for tracks that are new.
  pub fn sync<S: TrackStore>(&mut self, store: &S, inbox: &Inbox, present: &[Uuid]) {
    let keep: HashSet<Uuid> = present.iter().copied().collect();
    let before = self.watches.len();
    self.watches.retain(|id, _| keep.contains(id));
    self.values.retain(|id, _| keep.contains(id));
    let removed = before - self.watches.len();

    let mut opened = 0;
    for &track_id in present {
      if self.watches.contains_key(&track_id) {
        continue;
      }
      let epoch = self.next_epoch;
      self.next_epoch += 1;
      let link = forward(
        store.subscribe_ratings(track_id),
        inbox.clone(),
        move |delivery| Inbound::Ratings { track_id, epoch, delivery },
      );
      self.watches.insert(track_id, Watch { epoch, seq: None, failed: false, _link: link });
      opened += 1;
    }
    if removed + opened > 0 {
      debug!(removed, opened, "synced rating queries");
    }
  }

  pub fn apply(
    &mut self,
    track_id: Uuid,
    epoch: u64,
    delivery: Delivery<Vec<Rating>, BoxError>,
  ) -> AggregateChange {
    let Some(watch) = self.watches.get_mut(&track_id) else {
      return AggregateChange::Stale;
    };
    if watch.epoch != epoch {
      return AggregateChange::Stale;
    }
    match delivery {
      Ok(snapshot) => {
        if watch.seq.is_some_and(|s| snapshot.seq <= s) {
          return AggregateChange::Stale;
        }
        watch.seq = Some(snapshot.seq);
        let mean = mean_score(&snapshot.data);
        self.values.insert(track_id, mean);
        AggregateChange::Updated(mean)
      }
      Err(e) => {
        watch.failed = true;
        warn!(%track_id, error = %e, "rating query failed");
        AggregateChange::Failed(e.to_string())
      }
    }
  }

  /// Tear down every query.
  pub fn clear(&mut self) {
    self.watches.clear();
    self.values.clear();
  }
}
