//! Multipart hashing: a fixed pool of chunk workers fed round robin, with an
//! aggregator thread folding their digests back into index order.

use crate::aggregate::{Aggregator, AggregatorEvent};
use crate::chunk::ChunkPlan;
use crate::error::VerifyError;
use crate::etag::DIGEST_LEN;
use crate::worker::{ChunkWorker, WorkerHandle};
use indicatif::ProgressBar;
use log::{debug, info};
use std::path::Path;

/// Compute the multipart digest of `path` laid out by `plan` using up to
/// `workers` threads, each with its own file handle.
///
/// Job `i` always goes to worker `i % workers`. The first error aborts the
/// whole run; no digest is returned unless every chunk was hashed.
pub fn hash_chunked(
    path: &Path,
    plan: &ChunkPlan,
    workers: usize,
    progress: Option<&ProgressBar>,
) -> Result<[u8; DIGEST_LEN], VerifyError> {
    if workers == 0 {
        return Err(VerifyError::InvalidConfig(
            "worker count must be at least 1".to_string(),
        ));
    }
    let pool_size = workers.min(plan.chunk_count() as usize);
    let (aggregator, results) = Aggregator::new(plan.chunk_count());

    // Every handle is opened before any thread starts; on failure the ones
    // already opened are dropped here.
    let mut opened = Vec::with_capacity(pool_size);
    for id in 0..pool_size {
        opened.push(ChunkWorker::open(
            id,
            path,
            results.clone(),
            progress.cloned(),
        )?);
    }

    info!(
        "Hashing {} chunks of {} bytes with {} workers",
        plan.chunk_count(),
        plan.chunk_size(),
        pool_size
    );
    let aggregator = aggregator.spawn();
    let pool: Vec<WorkerHandle> = opened
        .into_iter()
        .map(|(worker, jobs)| worker.spawn(jobs))
        .collect();

    let mut dispatched = 0u32;
    for job in plan.jobs() {
        if !pool[job.index as usize % pool_size].submit(job) {
            debug!("Worker stopped early, aborting dispatch at chunk {}", job.index);
            break;
        }
        dispatched += 1;
    }
    // The aggregator may already have bailed out with an error.
    let _ = results.send(AggregatorEvent::AllSent { dispatched });
    drop(results);

    let mut shutdown = Ok(());
    for (i, worker) in pool.into_iter().enumerate() {
        let joined = worker.shutdown();
        debug!("Joined worker thread {}", i);
        if shutdown.is_ok() {
            shutdown = joined;
        }
    }

    let digest = aggregator
        .join()
        .map_err(|_| VerifyError::ThreadPanicked("aggregator".to_string()))??;
    shutdown?;
    Ok(digest)
}
