//! Single-flight memoization of an async operation.
//!
//! The first caller starts the operation; callers arriving while it runs get
//! a clone of the same shared future. The memo is released by the operation
//! itself when it settles, so release happens exactly once whatever the
//! outcome. If every waiter drops, the next caller picks the same future up
//! and drives it to completion.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex};

type SharedOp<T> = Shared<BoxFuture<'static, T>>;

pub struct SingleFlight<T: Clone> {
    name: &'static str,
    slot: Arc<Mutex<Option<SharedOp<T>>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Join the in-flight operation or start a new one with `start`.
    pub fn run<F, Fut>(&self, start: F) -> SharedOp<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = slot.as_ref() {
            tracing::debug!(operation = self.name, "Joining in-flight operation");
            return existing.clone();
        }

        let release = Arc::clone(&self.slot);
        let name = self.name;
        let operation = start();
        let shared = async move {
            let output = operation.await;
            release.lock().unwrap_or_else(|e| e.into_inner()).take();
            tracing::debug!(operation = name, "Operation settled");
            output
        }
        .boxed()
        .shared();

        *slot = Some(shared.clone());
        shared
    }

    pub fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_execution() {
        let flight = SingleFlight::<u32>::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                7
            }
        };

        let a = flight.run(make(calls.clone()));
        let b = flight.run(make(calls.clone()));
        assert!(flight.in_flight());

        let (ra, rb) = tokio::join!(a, b);
        assert_eq!((ra, rb), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flight.in_flight());
    }

    #[tokio::test]
    async fn test_released_after_settlement() {
        let flight = SingleFlight::<u32>::new("test");
        assert_eq!(flight.run(|| async { 1 }).await, 1);
        assert!(!flight.in_flight());
        assert_eq!(flight.run(|| async { 2 }).await, 2);
    }
}
