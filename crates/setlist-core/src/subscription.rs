//! Live subscriptions: a cancellable stream of sequence-numbered snapshots.
//!
//! Every push carries the *complete* current state of the subscribed scope,
//! so a consumer only ever replaces its copy with the latest snapshot. The
//! sequence number makes "latest wins" checkable instead of implied by
//! arrival order.

use tokio::sync::mpsc;

/// One full-state push from a live query.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
  /// Strictly increasing per subscription, starting at 0.
  pub seq:  u64,
  pub data: T,
}

/// What a subscriber receives: a snapshot, or the error that ended the
/// subscription.
pub type Delivery<T, E> = Result<Snapshot<T>, E>;

// ─── Disposer ────────────────────────────────────────────────────────────────

/// Tear-down hook for a live query. Runs exactly once: on [`Disposer::run`]
/// or on drop, whichever comes first.
pub struct Disposer {
  hook: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposer {
  pub fn new(hook: impl FnOnce() + Send + 'static) -> Self {
    Self { hook: Some(Box::new(hook)) }
  }

  pub fn noop() -> Self { Self { hook: None } }

  pub fn run(&mut self) {
    if let Some(hook) = self.hook.take() {
      hook();
    }
  }
}

impl Drop for Disposer {
  fn drop(&mut self) { self.run(); }
}

impl std::fmt::Debug for Disposer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Disposer")
      .field("armed", &self.hook.is_some())
      .finish()
  }
}

// ─── Publisher ───────────────────────────────────────────────────────────────

/// The producing half, held by the storage backend.
pub struct Publisher<T, E> {
  tx:       mpsc::UnboundedSender<Delivery<T, E>>,
  next_seq: u64,
}

impl<T, E> Publisher<T, E> {
  /// Push a full snapshot. Returns `false` once the subscriber is gone.
  pub fn publish(&mut self, data: T) -> bool {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.tx.send(Ok(Snapshot { seq, data })).is_ok()
  }

  /// Report the error that ends this subscription.
  pub fn fail(self, error: E) { let _ = self.tx.send(Err(error)); }

  pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// The consuming half of a live query.
pub struct Subscription<T, E> {
  rx:       mpsc::UnboundedReceiver<Delivery<T, E>>,
  disposer: Disposer,
}

/// Create a connected publisher/subscription pair with no disposer attached.
pub fn channel<T, E>() -> (Publisher<T, E>, Subscription<T, E>) {
  let (tx, rx) = mpsc::unbounded_channel();
  (
    Publisher { tx, next_seq: 0 },
    Subscription { rx, disposer: Disposer::noop() },
  )
}

impl<T, E> Subscription<T, E> {
  /// Attach the hook that tears down the producing side.
  pub fn with_disposer(mut self, disposer: Disposer) -> Self {
    self.disposer = disposer;
    self
  }

  /// Wait for the next delivery. `None` once the producer has finished.
  pub async fn next(&mut self) -> Option<Delivery<T, E>> { self.rx.recv().await }

  /// Tear the subscription down now.
  pub fn dispose(mut self) {
    self.rx.close();
    self.disposer.run();
  }
}

impl<T, E> std::fmt::Debug for Subscription<T, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("disposer", &self.disposer)
      .finish_non_exhaustive()
  }
}
