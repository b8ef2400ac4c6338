//! Bounded worker pool with one barrier per stage.

use rayon::prelude::*;

use crate::{AsciiMediaError, Result};

/// A dedicated rayon pool.
///
/// [`WorkerPool::map`] runs every item to completion (there is no early cancellation)
/// and returns once all of them are done, with results in input order.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// `None` sizes the pool to the available hardware concurrency.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        if threads == Some(0) {
            return Err(AsciiMediaError::config("worker count must be >= 1 when set"));
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| AsciiMediaError::Pool(format!("failed to build thread pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }

    /// Like [`WorkerPool::map`], but fails with the first error in input order once
    /// every item has finished.
    pub fn try_map<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        self.map(items, f).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(WorkerPool::new(Some(0)), Err(AsciiMediaError::Config(_))));
    }

    #[test]
    fn explicit_worker_count_is_honoured() {
        assert_eq!(WorkerPool::new(Some(3)).unwrap().workers(), 3);
    }

    #[test]
    fn map_preserves_input_order() {
        let pool = WorkerPool::new(Some(4)).unwrap();
        let items: Vec<u32> = (0..100).collect();
        assert_eq!(pool.map(&items, |x| x * 2), (0..100).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn try_map_runs_every_item_before_failing() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let ran = AtomicUsize::new(0);
        let items: Vec<u32> = (0..20).collect();
        let res = pool.try_map(&items, |&x| {
            ran.fetch_add(1, Ordering::SeqCst);
            if x == 3 {
                Err(AsciiMediaError::pipeline("boom"))
            } else {
                Ok(x)
            }
        });
        assert!(matches!(res, Err(AsciiMediaError::Pipeline(m)) if m == "boom"));
        assert_eq!(ran.load(Ordering::SeqCst), 20);
    }
}
