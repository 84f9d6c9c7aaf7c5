//! Common utilities used across the crate.
//!
//! This module provides the parallelism switch and thread pool setup used by
//! batch evaluation.

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// Passed down from the evaluation entry point. When `Parallel`, callers may
/// use `rayon` parallel iterators; when `Sequential`, they must not.
///
/// The thread pool itself is set up once via [`run_with_threads`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Order-preserving map with per-worker state.
    ///
    /// `init` runs once per rayon work split (parallel) or once in total
    /// (sequential). The output keeps the input order either way.
    #[inline]
    pub fn maybe_par_map_init<T, B, I, INIT, S, F>(self, iter: I, init: INIT, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        INIT: Fn() -> S + Sync + Send,
        F: Fn(&mut S, T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map_init(init, f).collect()
        } else {
            let mut state = init();
            iter.into_iter().map(|item| f(&mut state, item)).collect()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// If a dedicated pool cannot be created the closure runs on the current
/// rayon pool instead.
///
/// # Example
///
/// ```ignore
/// use bonsai::run_with_threads;
///
/// let evaluation = run_with_threads(4, |parallelism| score_all(parallelism));
/// ```
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let parallelism = Parallelism::from_threads(n_threads);

    match parallelism {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
                Err(err) => {
                    tracing::warn!(%err, "failed to build thread pool, using the global pool");
                    f(Parallelism::Parallel)
                }
            }
        }
    }
}
