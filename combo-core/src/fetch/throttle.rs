//! Inter-request spacing for a single source.

use rand::Rng;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Randomized gap between two requests to the same source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDelay {
    pub min: Duration,
    pub max: Duration,
}

impl RequestDelay {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// Pick a gap uniformly from `[min, max]`.
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for RequestDelay {
    /// 2–5 seconds.
    fn default() -> Self {
        Self {
            min: Duration::from_secs(2),
            max: Duration::from_secs(5),
        }
    }
}

/// Spaces out requests to one source.
///
/// Owned by the source handle, so every coordinator talking to the same
/// source shares it while different sources never wait on each other.
#[derive(Debug)]
pub struct Throttle {
    delay: RequestDelay,
    next_allowed: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: RequestDelay) -> Self {
        Self {
            delay,
            next_allowed: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> RequestDelay {
        self.delay
    }

    /// Block until this source may be contacted again, then reserve the slot.
    ///
    /// The lock is held while sleeping, which serializes concurrent callers
    /// for the same source.
    pub fn wait_turn(&self) {
        let mut next = self.next_allowed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(at) = *next {
            let now = Instant::now();
            if at > now {
                std::thread::sleep(at - now);
            }
        }
        let gap = self.delay.sample(&mut rand::thread_rng());
        *next = Some(Instant::now() + gap);
    }
}
