//! Per-second capped token bucket used by locally-configured rules.

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, Default)]
struct ReservoirState {
    current_epoch: i64,
    used: u64,
}

/// A per-second reservoir: at most `capacity` tokens may be taken within any
/// one wall-clock second.
#[derive(Debug)]
pub struct Reservoir {
    capacity: u64,
    state: Mutex<ReservoirState>,
}

impl Reservoir {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            state: Mutex::new(ReservoirState::default()),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Attempts to take one token at the given wall-clock second. Resets the
    /// epoch (and `used`) if `now` differs from the reservoir's current
    /// epoch.
    pub fn take(&self, now: i64) -> bool {
        let mut state = self.state.lock();
        if state.current_epoch != now {
            state.current_epoch = now;
            state.used = 0;
        }
        if state.used < self.capacity {
            state.used += 1;
            true
        } else {
            false
        }
    }

    /// Current epoch and used-count, for diagnostics/tests.
    pub fn used(&self) -> u64 {
        self.state.lock().used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_up_to_capacity_then_refuses() {
        let r = Reservoir::new(2);
        assert!(r.take(100));
        assert!(r.take(100));
        assert!(!r.take(100));
    }

    #[test]
    fn resets_on_new_epoch() {
        let r = Reservoir::new(1);
        assert!(r.take(100));
        assert!(!r.take(100));
        assert!(r.take(101));
    }

    #[test]
    fn zero_capacity_never_takes() {
        let r = Reservoir::new(0);
        assert!(!r.take(100));
    }
}
