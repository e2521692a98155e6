use crate::common::traits::CrashPointSource;
use crate::games::types::round2;
use std::collections::VecDeque;

/// Multiplier reported when no round has crashed yet
pub const DEFAULT_LAST_CRASH: f64 = 1.0;

/// Bounded, most-recent-first record of crash multipliers
#[derive(Debug, Clone)]
pub struct HistoryStore {
    rounds: VecDeque<f64>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            rounds: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Seed with `count` generated past rounds, oldest drawn first
    pub fn prefill<S: CrashPointSource + ?Sized>(&mut self, source: &mut S, count: usize) {
        for _ in 0..count {
            self.record(source.next_crash_point());
        }
    }

    /// Prepend a crash value, evicting the oldest once full
    pub fn record(&mut self, multiplier: f64) {
        if self.capacity == 0 {
            return;
        }
        self.rounds.push_front(round2(multiplier));
        self.rounds.truncate(self.capacity);
    }

    pub fn last_crash(&self) -> f64 {
        self.rounds.front().copied().unwrap_or(DEFAULT_LAST_CRASH)
    }

    /// The `k` largest recorded values, highest first
    pub fn top(&self, k: usize) -> Vec<f64> {
        let mut sorted = self.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));
        sorted.truncate(k);
        sorted
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.rounds.iter()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.rounds.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::crash_point::ScriptedCrashPoints;

    #[test]
    fn test_empty_history_defaults() {
        let history = HistoryStore::new(20);
        assert!(history.is_empty());
        assert_eq!(history.last_crash(), 1.0);
        assert!(history.top(5).is_empty());
    }

    #[test]
    fn test_most_recent_first() {
        let mut history = HistoryStore::new(20);
        history.record(1.5);
        history.record(3.25);
        history.record(2.0);

        assert_eq!(history.to_vec(), vec![2.0, 3.25, 1.5]);
        assert_eq!(history.last_crash(), 2.0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = HistoryStore::new(20);
        for i in 0..25 {
            history.record(1.0 + i as f64);
        }

        assert_eq!(history.len(), 20);
        assert_eq!(history.last_crash(), 25.0);
        // Entries 1.0..=5.0 were the oldest and are gone
        assert_eq!(*history.iter().last().unwrap(), 6.0);
        assert!(history.iter().all(|&m| m > 5.0));
    }

    #[test]
    fn test_values_stored_rounded() {
        let mut history = HistoryStore::new(3);
        history.record(2.34567);
        assert_eq!(history.last_crash(), 2.35);
    }

    #[test]
    fn test_top_k() {
        let mut history = HistoryStore::new(20);
        for m in [1.2, 42.58, 3.0, 1.0, 7.5, 2.2] {
            history.record(m);
        }

        assert_eq!(history.top(3), vec![42.58, 7.5, 3.0]);
        assert_eq!(history.top(100).len(), 6);
    }

    #[test]
    fn test_prefill() {
        let mut history = HistoryStore::new(2);
        let mut source = ScriptedCrashPoints::new([1.5, 2.5, 3.5]);
        history.prefill(&mut source, 3);

        assert_eq!(history.to_vec(), vec![3.5, 2.5]);
    }
}
