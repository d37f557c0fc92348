//! Generic read model with wholesale replacement.
//!
//! A [`ReadModel`] holds one value behind an `Arc` and broadcasts every
//! change over a `watch` channel. Resolution passes are counted: the model
//! reports [`Phase::Loading`] while any pass is in flight, each completed
//! pass replaces the value with a fresh `Arc`, and the last pass to
//! complete wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Lifecycle phase of a read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, no pass started yet.
    Uninitialized,
    /// At least one resolution pass is in flight.
    Loading,
    /// The latest pass has completed and nothing is in flight.
    Ready,
    /// Disposed; further passes are ignored.
    Disposed,
}

/// Point-in-time view of a read model.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub phase: Phase,
    pub value: Arc<T>,
    /// Number of completed passes.
    pub generation: u64,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase,
            value: Arc::clone(&self.value),
            generation: self.generation,
        }
    }
}

/// Read model over a value of type `T`.
pub struct ReadModel<T> {
    tx: watch::Sender<Snapshot<T>>,
    /// Passes in flight. Held while publishing so phase changes are ordered.
    inflight: Mutex<usize>,
}

impl<T> ReadModel<T> {
    /// Creates an uninitialized model holding `initial`.
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(Snapshot {
            phase: Phase::Uninitialized,
            value: Arc::new(initial),
            generation: 0,
        });
        Self {
            tx,
            inflight: Mutex::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    /// Reads the current value without cloning the snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.tx.borrow().value)
    }

    /// Receiver notified on every phase or value change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.tx.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.tx.borrow().phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase() == Phase::Loading
    }

    /// Marks the start of a pass. Returns `None` once disposed.
    ///
    /// The pass stays counted until the returned [`Pass`] is published or
    /// dropped, so an abandoned pass never leaves the model loading.
    pub fn begin(&self) -> Option<Pass<'_, T>> {
        let mut inflight = self.lock();
        if self.phase() == Phase::Disposed {
            return None;
        }
        *inflight += 1;
        self.tx.send_if_modified(|s| {
            let changed = s.phase != Phase::Loading;
            s.phase = Phase::Loading;
            changed
        });
        Some(Pass {
            model: self,
            finished: false,
        })
    }

    /// Ends a pass, replacing the value wholesale when one is given.
    ///
    /// Returns `false` if the model was disposed or there was no value.
    fn finish(&self, value: Option<T>) -> bool {
        let mut inflight = self.lock();
        *inflight = inflight.saturating_sub(1);
        if self.phase() == Phase::Disposed {
            return false;
        }
        let pending = *inflight;
        let published = value.is_some();
        self.tx.send_if_modified(|s| {
            let before = s.phase;
            if let Some(value) = value {
                s.value = Arc::new(value);
                s.generation += 1;
            }
            s.phase = match (pending, s.generation) {
                (0, 0) => Phase::Uninitialized,
                (0, _) => Phase::Ready,
                _ => Phase::Loading,
            };
            published || s.phase != before
        });
        published
    }

    /// Permanently disposes the model. The last value stays readable.
    pub fn dispose(&self) {
        let mut inflight = self.lock();
        *inflight = 0;
        self.tx.send_if_modified(|s| {
            let changed = s.phase != Phase::Disposed;
            s.phase = Phase::Disposed;
            changed
        });
    }
}

/// An in-flight resolution pass.
///
/// Dropping a pass without publishing abandons it: the pass stops counting
/// and the model returns to its previous phase once nothing else is in
/// flight.
#[must_use = "a pass that is dropped is abandoned"]
pub struct Pass<'a, T> {
    model: &'a ReadModel<T>,
    finished: bool,
}

impl<T> Pass<'_, T> {
    /// Completes the pass with `value`.
    ///
    /// Returns `false` if the model was disposed and the value discarded.
    pub fn publish(mut self, value: T) -> bool {
        self.finished = true;
        self.model.finish(Some(value))
    }
}

impl<T> Drop for Pass<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.model.finish(None);
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ReadModel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadModel")
            .field("snapshot", &*self.tx.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized() {
        let model = ReadModel::new(vec![1]);
        let snap = model.snapshot();
        assert_eq!(snap.phase, Phase::Uninitialized);
        assert_eq!(snap.generation, 0);
        assert_eq!(*snap.value, vec![1]);
        assert!(!model.is_loading());
    }

    #[test]
    fn begin_then_publish() {
        let model = ReadModel::new(0);
        let pass = model.begin().unwrap();
        assert!(model.is_loading());

        assert!(pass.publish(5));
        let snap = model.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(*snap.value, 5);
        assert_eq!(snap.generation, 1);
    }

    #[test]
    fn publish_replaces_arc() {
        let model = ReadModel::new(String::from("same"));
        let before = model.snapshot().value;

        model.begin().unwrap().publish(String::from("same"));
        let after = model.snapshot().value;

        assert_eq!(before, after);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn overlapping_passes_last_publish_wins() {
        let model = ReadModel::new(0);
        let first = model.begin().unwrap();
        let second = model.begin().unwrap();

        first.publish(1);
        assert_eq!(model.phase(), Phase::Loading);
        assert_eq!(model.read(|v| *v), 1);

        second.publish(2);
        assert_eq!(model.phase(), Phase::Ready);
        assert_eq!(model.read(|v| *v), 2);
        assert_eq!(model.snapshot().generation, 2);
    }

    #[test]
    fn dropped_pass_before_first_publish_reverts_to_uninitialized() {
        let model = ReadModel::new(0);
        drop(model.begin().unwrap());

        assert_eq!(model.phase(), Phase::Uninitialized);
        assert!(!model.is_loading());
        assert_eq!(model.snapshot().generation, 0);
    }

    #[test]
    fn dropped_pass_after_publish_returns_to_ready() {
        let model = ReadModel::new(0);
        model.begin().unwrap().publish(1);

        let abandoned = model.begin().unwrap();
        assert!(model.is_loading());
        drop(abandoned);

        assert_eq!(model.phase(), Phase::Ready);
        assert_eq!(model.read(|v| *v), 1);

        // Later passes settle normally.
        model.begin().unwrap().publish(2);
        assert_eq!(model.phase(), Phase::Ready);
        assert_eq!(model.snapshot().generation, 2);
    }

    #[test]
    fn dropped_pass_keeps_loading_while_another_runs() {
        let model = ReadModel::new(0);
        let running = model.begin().unwrap();
        drop(model.begin().unwrap());
        assert_eq!(model.phase(), Phase::Loading);

        running.publish(3);
        assert_eq!(model.phase(), Phase::Ready);
    }

    #[test]
    fn dispose_discards_later_results() {
        let model = ReadModel::new(0);
        let pass = model.begin().unwrap();
        model.dispose();

        assert!(!pass.publish(9));
        assert_eq!(model.phase(), Phase::Disposed);
        assert_eq!(model.read(|v| *v), 0);
        assert!(model.begin().is_none());
    }

    #[test]
    fn dropped_pass_after_dispose_stays_disposed() {
        let model = ReadModel::new(0);
        let pass = model.begin().unwrap();
        model.dispose();
        drop(pass);
        assert_eq!(model.phase(), Phase::Disposed);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let model = ReadModel::new(0);
        let mut rx = model.subscribe();

        model.begin().unwrap().publish(3);

        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(*snap.value, 3);
    }
}
