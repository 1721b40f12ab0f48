//! Concurrent request limiting.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counting gate over in-flight requests.
///
/// Acquisition either succeeds immediately or fails; nothing queues. The
/// caller turns a failed acquire into a 503 so overload stays visible
/// instead of piling up latency.
pub struct ConnectionGate {
    active: AtomicUsize,
    max: usize,
}

impl ConnectionGate {
    pub fn new(max: usize) -> Self {
        Self { active: AtomicUsize::new(0), max }
    }

    /// Take a permit, or `None` at capacity. The permit is released when
    /// the guard drops.
    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        let prev = self.active.fetch_add(1, Ordering::AcqRel);
        if prev >= self.max {
            self.active.fetch_sub(1, Ordering::AcqRel);
            return None;
        }
        Some(GateGuard { gate: self })
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

/// RAII permit from a [`ConnectionGate`].
pub struct GateGuard<'a> {
    gate: &'a ConnectionGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.active.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_enforces_capacity() {
        let gate = ConnectionGate::new(2);
        let a = gate.try_acquire().unwrap();
        let _b = gate.try_acquire().unwrap();
        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.active(), 2);

        drop(a);
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_guard_drop_releases() {
        let gate = ConnectionGate::new(1);
        for _ in 0..10 {
            let guard = gate.try_acquire().unwrap();
            drop(guard);
        }
        assert_eq!(gate.active(), 0);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let gate = ConnectionGate::new(0);
        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.active(), 0);
    }
}
