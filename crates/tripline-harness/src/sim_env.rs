//! Virtual clock and seeded randomness.

use std::{cell::RefCell, ops::Range, rc::Rc, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tripline_core::Environment;
use tripline_proto::Timestamp;

/// Deterministic environment shared by every simulated peer and the relay.
///
/// Time only moves when [`SimEnv::advance`] is called. Randomness comes from
/// one seeded ChaCha stream, so a seed reproduces a run exactly.
#[derive(Debug, Clone)]
pub struct SimEnv {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Debug)]
struct Inner {
    now: Timestamp,
    rng: ChaCha8Rng,
}

impl SimEnv {
    /// Clock starting at `start_millis`, randomness seeded with `seed`.
    pub fn new(start_millis: u64, seed: u64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                now: Timestamp::from_millis(start_millis),
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.borrow_mut();
        inner.now = inner.now.saturating_add(by);
    }

    /// Uniform sample from `range`.
    pub fn gen_range(&self, range: Range<u64>) -> u64 {
        self.inner.borrow_mut().rng.gen_range(range)
    }

    /// True with probability `p`.
    pub fn chance(&self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        self.inner.borrow_mut().rng.gen_bool(p.min(1.0))
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Timestamp {
        self.inner.borrow().now
    }
}
