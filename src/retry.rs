//! Background retry timers, one per resource key
//!
//! When every synchronous path for a resource fails, the fetcher arms a
//! single-shot timer here to try again later without blocking the caller.
//! At most one timer per key can be armed: arming an already-armed key is a
//! no-op, which keeps concurrent failures from stacking retries. The armed
//! flag is cleared before the action runs, so a retry that fails again can
//! re-arm itself.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::logger::{self, LogTag};

#[derive(Clone, Default)]
pub struct RetryScheduler {
    armed: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to run once after `delay`, unless a timer for this
    /// key is already armed.
    pub fn arm<F>(&self, key: &str, delay: Duration, action: F)
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let mut armed = self.armed.lock().unwrap();
        if armed.contains_key(key) {
            logger::debug(LogTag::Retry, &format!("retry already armed for {}", key));
            return;
        }

        let owned_key = key.to_string();
        let map = Arc::clone(&self.armed);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Clear the armed flag before running so the action can re-arm.
            map.lock().unwrap().remove(&owned_key);
            action().await;
        });
        armed.insert(key.to_string(), handle);

        logger::debug(
            LogTag::Retry,
            &format!("armed retry for {} in {:?}", key, delay),
        );
    }

    /// Abort a pending timer without running it. Has no effect once the
    /// timer has fired.
    pub fn cancel(&self, key: &str) {
        if let Some(handle) = self.armed.lock().unwrap().remove(key) {
            handle.abort();
            logger::debug(LogTag::Retry, &format!("cancelled retry for {}", key));
        }
    }

    pub fn is_armed(&self, key: &str) -> bool {
        self.armed.lock().unwrap().contains_key(key)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[tokio::test]
    async fn fires_once_after_delay() {
        let retries = RetryScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        retries.arm("token:eth:0xabc", Duration::from_millis(30), move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        assert!(retries.is_armed("token:eth:0xabc"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!retries.is_armed("token:eth:0xabc"));
    }

    #[tokio::test]
    async fn double_arm_schedules_a_single_execution() {
        let retries = RetryScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let counter = Arc::clone(&fired);
            retries.arm("markets:usd:1", Duration::from_millis(30), move || {
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });
        }
        assert_eq!(retries.armed_count(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_firing() {
        let retries = RetryScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        retries.arm("coin:bitcoin", Duration::from_millis(30), move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        retries.cancel("coin:bitcoin");
        assert!(!retries.is_armed("coin:bitcoin"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn armed_flag_is_cleared_before_the_action_runs() {
        let retries = RetryScheduler::new();
        let was_armed_inside = Arc::new(AtomicBool::new(true));

        let inner = Arc::clone(&was_armed_inside);
        let observer = retries.clone();
        retries.arm("chart:bitcoin:7", Duration::from_millis(20), move || {
            Box::pin(async move {
                inner.store(observer.is_armed("chart:bitcoin:7"), Ordering::SeqCst);
            })
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!was_armed_inside.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn can_rearm_after_firing() {
        let retries = RetryScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let counter = Arc::clone(&fired);
            retries.arm("history:eth:0xabc:30d", Duration::from_millis(20), move || {
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });
            tokio::time::sleep(Duration::from_millis(60)).await;
        }

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn timers_for_distinct_keys_are_independent() {
        let retries = RetryScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for key in ["a", "b"] {
            let counter = Arc::clone(&fired);
            retries.arm(key, Duration::from_millis(20), move || {
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });
        }
        assert_eq!(retries.armed_count(), 2);

        retries.cancel("a");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
