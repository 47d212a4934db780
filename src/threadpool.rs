//! Parallel dispatch of operator work.
//!
//! An operator splits its output into disjoint cells (one per batch element and output row for
//! pooling, one per row tile for PReLU) and hands them to a [`ThreadPool`]. Every cell is
//! visited exactly once, in no particular order.

use rayon::prelude::*;

/// Work-submission interface used by `run`.
pub trait ThreadPool: Sync {
    /// Number of threads that may execute cells concurrently.
    fn threads_count(&self) -> usize;

    /// Calls `task(i, &mut cells[i])` for every cell.
    fn parallelize_1d<C, F>(&self, cells: &mut [C], task: F)
    where
        C: Send,
        F: Fn(usize, &mut C) + Sync + Send;

    /// Calls `task(i, j, cell)` for every `(i, j)` in `range`, where `cells` holds the grid in
    /// row-major order.
    fn parallelize_2d<C, F>(&self, range: (usize, usize), cells: &mut [C], task: F)
    where
        C: Send,
        F: Fn(usize, usize, &mut C) + Sync + Send,
    {
        debug_assert_eq!(cells.len(), range.0 * range.1);
        let columns = range.1;
        self.parallelize_1d(cells, |index, cell| {
            task(index / columns, index % columns, cell)
        });
    }
}

/// Runs every cell on the calling thread, in order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sequential;

impl ThreadPool for Sequential {
    fn threads_count(&self) -> usize {
        1
    }

    fn parallelize_1d<C, F>(&self, cells: &mut [C], task: F)
    where
        C: Send,
        F: Fn(usize, &mut C) + Sync + Send,
    {
        for (index, cell) in cells.iter_mut().enumerate() {
            task(index, cell);
        }
    }
}

/// Runs cells on a rayon pool: the global one, or a pool owned by this value.
#[derive(Debug, Default)]
pub struct RayonThreadPool {
    pool: Option<rayon::ThreadPool>,
}

impl RayonThreadPool {
    /// Uses rayon's global pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Builds a dedicated pool with `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        Ok(Self { pool: Some(pool) })
    }
}

impl ThreadPool for RayonThreadPool {
    fn threads_count(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn parallelize_1d<C, F>(&self, cells: &mut [C], task: F)
    where
        C: Send,
        F: Fn(usize, &mut C) + Sync + Send,
    {
        let mut work = || {
            cells
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, cell)| task(index, cell))
        };
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}
