//! Observable state cells.
//!
//! Each change publishes one [`Transition`]: the new value, when it happened
//! and a sequence number. Collaborators either read the latest value or
//! subscribe to a `watch` receiver.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Transition<T> {
    pub value: T,
    pub at: DateTime<Utc>,
    pub seq: u64,
}

#[derive(Debug)]
pub struct StateCell<T> {
    tx: watch::Sender<Transition<T>>,
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Transition {
            value: initial,
            at: Utc::now(),
            seq: 0,
        });
        Self { tx }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.tx.borrow().value.clone()
    }

    /// Current value with its timestamp and sequence number.
    pub fn snapshot(&self) -> Transition<T> {
        self.tx.borrow().clone()
    }

    /// Publish a new value unconditionally.
    pub fn set(&self, value: T) {
        self.tx.send_modify(|current| {
            current.value = value;
            current.at = Utc::now();
            current.seq += 1;
        });
    }

    /// Derive the next value from the current one. `f` returns `None` to
    /// leave the state untouched; nothing is published in that case.
    /// Returns whether a transition was published.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> Option<T>,
    {
        self.tx.send_if_modified(|current| match f(&current.value) {
            Some(next) => {
                current.value = next;
                current.at = Utc::now();
                current.seq += 1;
                true
            }
            None => false,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Transition<T>> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
