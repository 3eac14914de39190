//! Process-wide parallelism setting.
//!
//! `--jobs` is stored once at startup; everything that spawns parallel work
//! (source scanning, ninja) reads it from here. Zero means "not set" and
//! falls back to the host's hardware concurrency.

use std::sync::atomic::{AtomicUsize, Ordering};

static JOBS: AtomicUsize = AtomicUsize::new(0);

/// Set the number of parallel jobs. Zero resets to the default.
pub fn set_jobs(jobs: usize) {
    JOBS.store(jobs, Ordering::Relaxed);
}

/// The effective number of parallel jobs.
pub fn jobs() -> usize {
    match JOBS.load(Ordering::Relaxed) {
        0 => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        n => n,
    }
}

/// Whether work may run on more than one thread.
pub fn is_parallel() -> bool {
    jobs() > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_default_nonzero() {
        assert!(jobs() >= 1);
    }
}
