//! Parallel processing utilities

use crate::error::{HousingError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of worker threads (None = all available cores)
    pub n_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n.max(1));
        self
    }

    /// Number of threads the pool will use
    pub fn num_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(num_cpus)
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Map fallible work over a bounded pool, preserving input order
///
/// The first error (in input order) is returned; remaining results are
/// discarded.
pub fn try_parallel_map<T, U, F>(items: Vec<T>, config: &ParallelConfig, f: F) -> Result<Vec<U>>
where
    T: Send,
    U: Send,
    F: Fn(T) -> Result<U> + Send + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads())
        .build()
        .map_err(|e| HousingError::ComputationError(format!("cannot build thread pool: {}", e)))?;

    pool.install(|| items.into_par_iter().map(f).collect::<Vec<_>>())
        .into_iter()
        .collect()
}
