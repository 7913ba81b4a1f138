//! Parallel processing strategies

#[cfg(feature = "parallel")]
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use lii_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Processing mode for fan-out of independent jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

/// Executor for a [`ProcessingMode`].
///
/// A dedicated pool for `ParallelWith` is built once here and reused by every
/// [`par_map`](Self::par_map). Clones share the pool.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    mode: ProcessingMode,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl WorkerPool {
    /// Build the executor for `mode`
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] for `ParallelWith(0)`
    /// - [`Error::Algorithm`] if the thread pool cannot be created
    pub fn new(mode: ProcessingMode) -> Result<Self> {
        if mode == ProcessingMode::ParallelWith(0) {
            return Err(Error::InvalidParameter {
                name: "threads",
                value: "0".into(),
                reason: "thread count must be > 0".into(),
            });
        }

        #[cfg(feature = "parallel")]
        let pool = match mode {
            ProcessingMode::ParallelWith(threads) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::Algorithm(format!("failed to build thread pool: {e}")))?,
            )),
            _ => None,
        };

        Ok(Self {
            mode,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Number of threads jobs are spread over
    pub fn threads(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            match (&self.pool, self.mode) {
                (Some(pool), _) => pool.current_num_threads(),
                (None, ProcessingMode::Sequential) => 1,
                (None, _) => rayon::current_num_threads(),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Map a function over indices and collect results in index order
    pub fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            match (&self.pool, self.mode) {
                (Some(pool), _) => pool.install(|| range.into_par_iter().map(f).collect()),
                (None, ProcessingMode::Sequential) => range.map(f).collect(),
                (None, _) => range.into_par_iter().map(f).collect(),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            range.map(f).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_par_map_preserves_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let pool = WorkerPool::new(mode).unwrap();
            let out = pool.par_map(0..64, |i| i * i);
            assert_eq!(out.len(), 64);
            assert!(out.iter().enumerate().all(|(i, v)| *v == i * i), "{:?}", mode);
        }
    }

    #[test]
    fn test_sequential_uses_one_thread() {
        let pool = WorkerPool::new(ProcessingMode::Sequential).unwrap();
        assert_eq!(pool.threads(), 1);
        assert_eq!(pool.mode(), ProcessingMode::Sequential);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_dedicated_pool_is_reused() {
        use std::collections::HashSet;
        use std::sync::Mutex;

        let pool = WorkerPool::new(ProcessingMode::ParallelWith(2)).unwrap();
        assert_eq!(pool.threads(), 2);

        let workers = Mutex::new(HashSet::new());
        for _ in 0..8 {
            pool.par_map(0..32, |_| {
                workers.lock().unwrap().insert(std::thread::current().id());
            });
        }
        // one pool of two workers serves every call
        assert!(workers.lock().unwrap().len() <= 2);

        let shared = pool.clone();
        assert_eq!(shared.threads(), 2);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let result = WorkerPool::new(ProcessingMode::ParallelWith(0));
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }
}
