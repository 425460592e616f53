//! Fan-out/fan-in evaluation for the exact-geometry stage.
//!
//! Tree descent is single-threaded, but the final exact-geometry checks are
//! independent per candidate, so they fan out over scoped worker threads.
//! Each worker fills a local buffer and the buffers are reduced on the
//! calling thread. No shared mutable collection, no locks on the hot path.

use crate::error::Result;

/// Workloads below this size run inline; spawning threads costs more than
/// the evaluation itself.
const SEQUENTIAL_CUTOFF: usize = 16;

/// Apply a fallible filter-map over `items`, in parallel, preserving input
/// order in the output.
///
/// The first error aborts the whole batch: queries are all-or-nothing at the
/// point of failure.
pub fn filter_map_parallel<T, R, F>(items: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<Option<R>> + Sync,
{
    if items.len() < SEQUENTIAL_CUTOFF {
        return filter_map_chunk(items, &f);
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(items.len());
    if workers <= 1 {
        return filter_map_chunk(items, &f);
    }
    let chunk_size = items.len().div_ceil(workers);

    let buffers = std::thread::scope(|scope| {
        let f = &f;
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || filter_map_chunk(chunk, f)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(buffer) => buffer,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect::<Vec<_>>()
    });

    // Single-threaded reduce over the per-worker buffers.
    let mut results = Vec::new();
    for buffer in buffers {
        results.extend(buffer?);
    }
    Ok(results)
}

fn filter_map_chunk<T, R, F>(chunk: &[T], f: &F) -> Result<Vec<R>>
where
    F: Fn(&T) -> Result<Option<R>>,
{
    let mut local = Vec::new();
    for item in chunk {
        if let Some(result) = f(item)? {
            local.push(result);
        }
    }
    Ok(local)
}
