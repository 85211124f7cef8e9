//! Replica selection strategies.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Picks which of `replicas` read nodes serves the next read.
///
/// Implementations must return an index below `replicas`; `replicas` is
/// always at least 2.
pub trait ReplicaSelector: Send + Sync + fmt::Debug {
    fn select(&self, replicas: usize) -> usize;
}

/// Uniform random choice using the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl ReplicaSelector for RandomSelector {
    fn select(&self, replicas: usize) -> usize {
        rand::rng().random_range(0..replicas)
    }
}

/// Cycles through the replicas in index order.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    next: AtomicUsize,
}

impl ReplicaSelector for RoundRobinSelector {
    fn select(&self, replicas: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % replicas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_stays_in_range() {
        let selector = RandomSelector;
        for _ in 0..1000 {
            assert!(selector.select(3) < 3);
        }
    }

    #[test]
    fn test_round_robin_cycles() {
        let selector = RoundRobinSelector::default();
        let picks: Vec<usize> = (0..6).map(|_| selector.select(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }
}
