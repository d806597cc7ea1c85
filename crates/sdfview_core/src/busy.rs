//! Busy indicator
//!
//! A counter of in-flight stage sequences. Each sequence holds a
//! [`BusyGuard`]; dropping the guard (on success, failure, or when a stale
//! sequence is abandoned) decrements the counter.

use std::cell::Cell;
use std::rc::Rc;

/// Shared busy counter; clones observe the same state
#[derive(Clone, Debug, Default)]
pub struct BusyIndicator {
    in_flight: Rc<Cell<usize>>,
}

impl BusyIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one more sequence in flight until the guard drops
    pub fn acquire(&self) -> BusyGuard {
        self.in_flight.set(self.in_flight.get() + 1);
        BusyGuard {
            in_flight: Rc::clone(&self.in_flight),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get() > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }
}

/// Holds the indicator busy while alive
#[derive(Debug)]
pub struct BusyGuard {
    in_flight: Rc<Cell<usize>>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_clears_on_drop() {
        let busy = BusyIndicator::new();
        assert!(!busy.is_busy());
        let guard = busy.acquire();
        assert!(busy.is_busy());
        drop(guard);
        assert!(!busy.is_busy());
    }

    #[test]
    fn test_overlapping_guards() {
        let busy = BusyIndicator::new();
        let a = busy.acquire();
        let b = busy.clone().acquire();
        assert_eq!(busy.in_flight(), 2);
        drop(a);
        assert!(busy.is_busy());
        drop(b);
        assert!(!busy.is_busy());
    }
}
