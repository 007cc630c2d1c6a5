//! Round-robin rotation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared rotation counter.
///
/// Every call to [`RoundRobin::next_index`] advances the counter by exactly
/// one, however many callers race on it, and reduces the new value modulo the
/// pool length. A fresh counter therefore hands out 1, 2, ... (mod len).
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter and return the next candidate index, or `None`
    /// for an empty pool.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        // Relaxed: only the uniqueness of each fetch_add result matters.
        let current = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        Some((current % len as u64) as usize)
    }

    /// Number of selections made so far.
    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_round_robin() {
        let rr = RoundRobin::new();
        assert_eq!(rr.next_index(2), Some(1));
        assert_eq!(rr.next_index(2), Some(0));
        assert_eq!(rr.next_index(2), Some(1));
        assert_eq!(rr.count(), 3);
    }

    #[test]
    fn empty_pool_has_no_index() {
        let rr = RoundRobin::new();
        assert_eq!(rr.next_index(0), None);
        assert_eq!(rr.count(), 0);
    }

    #[test]
    fn full_rotation_visits_each_index_once() {
        let rr = RoundRobin::new();
        let mut seen: Vec<usize> = (0..5).map(|_| rr.next_index(5).unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn thousandth_call_wraps_to_zero() {
        let rr = RoundRobin::new();
        for _ in 0..999 {
            rr.next_index(2);
        }
        assert_eq!(rr.next_index(2), Some(0));
        assert_eq!(rr.count(), 1000);
    }

    #[test]
    fn concurrent_callers_share_the_rotation_fairly() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1_003;
        const LEN: usize = 3;

        let rr = Arc::new(RoundRobin::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let rr = rr.clone();
                std::thread::spawn(move || {
                    let mut counts = [0usize; LEN];
                    for _ in 0..PER_THREAD {
                        counts[rr.next_index(LEN).unwrap()] += 1;
                    }
                    counts
                })
            })
            .collect();

        let mut totals = [0usize; LEN];
        for handle in handles {
            for (total, count) in totals.iter_mut().zip(handle.join().unwrap()) {
                *total += count;
            }
        }

        assert_eq!(rr.count(), (THREADS * PER_THREAD) as u64);
        let max = totals.iter().max().unwrap();
        let min = totals.iter().min().unwrap();
        assert!(max - min <= 1, "unfair distribution: {:?}", totals);
    }
}
