//! Run-scoped memo that collapses concurrent fetches of the same key.
//!
//! The first caller for a `(tier, key)` becomes the leader and runs the
//! fetch. Callers that arrive while the leader is still working block until
//! it finishes and share its result. Callers that arrive afterwards get the
//! memoized result directly, failures included, so a key is fetched at most
//! once per run.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::cache::{CacheTier, CachedValue};

#[derive(Default)]
struct Slot {
    /// `None` while the leader is working; `Some(result)` once done.
    result: Mutex<Option<Option<CachedValue>>>,
    ready: Condvar,
}

/// Completes its slot when dropped, so followers never wait on a leader
/// that panicked.
struct Leader {
    slot: Arc<Slot>,
    done: bool,
}

impl Leader {
    fn finish(&mut self, value: Option<CachedValue>) {
        if self.done {
            return;
        }
        self.done = true;
        let mut result = self.slot.result.lock().unwrap_or_else(PoisonError::into_inner);
        *result = Some(value);
        self.slot.ready.notify_all();
    }
}

impl Drop for Leader {
    fn drop(&mut self) {
        self.finish(None);
    }
}

#[derive(Default)]
pub(crate) struct RunMemo {
    slots: Mutex<HashMap<(CacheTier, String), Arc<Slot>>>,
}

impl RunMemo {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Return the run's result for `(tier, key)`, running `fetch` only if no
    /// other caller has claimed the key yet. The flag is true when this call
    /// ran `fetch` itself.
    pub(crate) fn get_or_fetch<F>(&self, tier: CacheTier, key: &str, fetch: F) -> (Option<CachedValue>, bool)
    where
        F: FnOnce() -> Option<CachedValue>,
    {
        let (slot, is_leader) = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match slots.get(&(tier, key.to_string())) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot = Arc::new(Slot::default());
                    slots.insert((tier, key.to_string()), Arc::clone(&slot));
                    (slot, true)
                }
            }
        };

        if is_leader {
            let mut leader = Leader { slot, done: false };
            let value = fetch();
            leader.finish(value.clone());
            return (value, true);
        }

        let mut result = slot.result.lock().unwrap_or_else(PoisonError::into_inner);
        while result.is_none() {
            result = slot.ready.wait(result).unwrap_or_else(PoisonError::into_inner);
        }
        (result.clone().flatten(), false)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn second_caller_reuses_result() {
        let memo = RunMemo::new();
        let calls = AtomicUsize::new(0);
        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(CachedValue::Price(429.99))
        };

        let (first, led) = memo.get_or_fetch(CacheTier::AmazonPrice, "Ryzen 9 9900X", fetch);
        assert!(led);
        let (second, led) = memo.get_or_fetch(CacheTier::AmazonPrice, "Ryzen 9 9900X", || {
            calls.fetch_add(1, Ordering::SeqCst);
            None
        });
        assert!(!led);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_memoized() {
        let memo = RunMemo::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let (value, _) = memo.get_or_fetch(CacheTier::DealDetail, "https://x/1", || {
                calls.fetch_add(1, Ordering::SeqCst);
                None
            });
            assert!(value.is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tiers_are_independent_namespaces() {
        let memo = RunMemo::new();
        memo.get_or_fetch(CacheTier::DealPrice, "k", || Some(CachedValue::ComboPrice(1.0)));
        let (_, led) = memo.get_or_fetch(CacheTier::AmazonPrice, "k", || Some(CachedValue::Price(2.0)));
        assert!(led);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn concurrent_callers_wait_for_the_leader() {
        let memo = RunMemo::new();
        let calls = AtomicUsize::new(0);

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        memo.get_or_fetch(CacheTier::AmazonPrice, "DDR5 32GB", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(50));
                            Some(CachedValue::Price(99.0))
                        })
                        .0
                    })
                })
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), Some(CachedValue::Price(99.0)));
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_leader_releases_followers() {
        let memo = RunMemo::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            memo.get_or_fetch(CacheTier::AmazonPrice, "k", || panic!("boom"));
        }));
        assert!(outcome.is_err());

        let (value, led) = memo.get_or_fetch(CacheTier::AmazonPrice, "k", || Some(CachedValue::Price(1.0)));
        assert!(!led);
        assert!(value.is_none());
    }
}
