//! Rayon-based parallelisation utilities.
//!
//! Small portfolios are priced on the calling thread; above a threshold the
//! trades are spread over the rayon pool, one trade per task.

use rayon::prelude::*;

/// Trade count from which pricing switches to the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Configuration for parallel execution.
#[derive(Clone, Debug)]
pub struct ParallelConfig {
    /// Minimum items before using parallelism
    pub parallel_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ParallelConfig {
    /// Creates a new parallel configuration.
    pub fn new(parallel_threshold: usize) -> Self {
        Self { parallel_threshold }
    }

    /// Configuration that never leaves the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel_threshold: usize::MAX,
        }
    }

    /// Returns whether to use parallel processing for the given item count.
    #[inline]
    pub fn should_parallelize(&self, n_items: usize) -> bool {
        n_items >= self.parallel_threshold
    }

    /// Maps `items` in order, in parallel when the count reaches the
    /// threshold.
    pub fn map<T, R, F>(&self, items: &[T], mapper: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.should_parallelize(items.len()) {
            items.par_iter().map(mapper).collect()
        } else {
            items.iter().map(mapper).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_config_default() {
        let config = ParallelConfig::default();
        assert_eq!(config.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
    }

    #[test]
    fn test_should_parallelize() {
        let config = ParallelConfig::new(100);
        assert!(!config.should_parallelize(50));
        assert!(config.should_parallelize(100));
        assert!(!ParallelConfig::sequential().should_parallelize(1_000_000));
    }

    #[test]
    fn test_map_preserves_order_either_way() {
        let items: Vec<i32> = (0..100).collect();
        let parallel = ParallelConfig::new(1).map(&items, |&x| x * 2);
        let sequential = ParallelConfig::sequential().map(&items, |&x| x * 2);
        assert_eq!(parallel, sequential);
        assert_eq!(parallel[50], 100);
    }
}
