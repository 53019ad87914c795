use log::info;
use rayon::ThreadPoolBuilder;

use crate::error::TerrainResult;

// A wrapper around Rayon's ThreadPool that runs chunk extraction jobs
pub struct ThreadPool {
    pool: rayon::ThreadPool,
    num_threads: usize,
}

impl ThreadPool {
    // Create a new ThreadPool with the specified number of threads
    // If size is 0, it will use num_cpus::get() to determine the optimal number
    pub fn new(size: usize) -> TerrainResult<ThreadPool> {
        let num_threads = if size > 0 { size } else { num_cpus::get() };

        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("terrain-worker-{}", index))
            .build()?;

        info!("Created thread pool with {} threads", num_threads);

        Ok(ThreadPool { pool, num_threads })
    }

    // Execute a job in the thread pool without waiting for it
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(f);
    }

    // Get the number of threads in the pool
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    // Execute a parallel task on a slice of data and wait for every result
    pub fn par_execute<T, F, R>(&self, data: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        F: Fn(&T) -> R + Send + Sync,
        R: Send,
    {
        use rayon::prelude::*;
        self.pool.install(|| data.par_iter().map(f).collect())
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool").field("num_threads", &self.num_threads).finish()
    }
}
