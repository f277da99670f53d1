use std::collections::VecDeque;

use crate::ping::LatencySummary;

/// Window size used by the live monitor unless configured otherwise.
pub const DEFAULT_WINDOW_SIZE: usize = 50;

/// Fixed-capacity FIFO of the most recent successful latencies.
///
/// Pushing into a full window evicts the oldest sample.
#[derive(Debug, Clone)]
pub struct RollingSampleWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl Default for RollingSampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl RollingSampleWindow {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, latency_ms: f64) {
        self.samples.push_back(latency_ms);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn summary(&self) -> Option<LatencySummary> {
        let (front, back) = self.samples.as_slices();
        if back.is_empty() {
            LatencySummary::from_samples(front)
        } else {
            LatencySummary::from_samples(&self.snapshot())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let window = RollingSampleWindow::new(3);
        assert!(window.is_empty());
        assert!(window.summary().is_none());
        assert!(window.latest().is_none());
    }

    #[test]
    fn overflow_keeps_last_values_in_order() {
        let capacity = 5;
        let mut window = RollingSampleWindow::new(capacity);
        for i in 0..(capacity + 3) {
            window.push(i as f64);
        }
        assert_eq!(window.len(), capacity);
        assert_eq!(window.snapshot(), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(window.latest(), Some(7.0));
    }

    #[test]
    fn summary_covers_only_windowed_samples() {
        let mut window = RollingSampleWindow::new(2);
        window.push(500.0);
        window.push(10.0);
        window.push(30.0);
        let s = window.summary().unwrap();
        assert_eq!(s.min_ms, 10.0);
        assert_eq!(s.max_ms, 30.0);
        assert_eq!(s.avg_ms, 20.0);
    }

    #[test]
    fn zero_capacity_holds_one_sample() {
        let mut window = RollingSampleWindow::new(0);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.snapshot(), vec![2.0]);
    }

    #[test]
    fn default_capacity_is_fifty() {
        let mut window = RollingSampleWindow::default();
        for i in 0..60 {
            window.push(i as f64);
        }
        assert_eq!(window.len(), DEFAULT_WINDOW_SIZE);
        assert_eq!(window.snapshot().first(), Some(&10.0));
    }
}
