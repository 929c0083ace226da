//! Top-level verification: pick the hashing path from the remote ETag, compute
//! the local ETag and compare.

use crate::chunk::ChunkPlan;
use crate::dispatch::hash_chunked;
use crate::error::VerifyError;
use crate::etag::ETag;
use crate::source::{MetadataSource, RemoteObject};
use crate::stream::hash_stream;
use crate::utils::{progress_bar, size_to_human_readable};
use crate::VerifyOptions;
use indicatif::ProgressBar;
use log::{info, warn};
use std::path::Path;
use std::time::{Duration, Instant};

/// Outcome of a completed comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub remote: ETag,
    pub computed: ETag,
    pub is_valid: bool,
    pub elapsed: Duration,
    /// The part size was guessed rather than reported by the provider.
    pub part_size_inferred: bool,
}

impl Verification {
    /// Only the digests decide: for multipart objects the local chunk count
    /// is taken from the remote one.
    pub fn compare(remote: ETag, computed: ETag, elapsed: Duration) -> Self {
        Self {
            is_valid: computed.digest() == remote.digest(),
            remote,
            computed,
            elapsed,
            part_size_inferred: false,
        }
    }

    pub fn outcome(&self) -> &'static str {
        if self.is_valid {
            "verified"
        } else {
            "compromised"
        }
    }
}

/// Fetch the remote metadata from `source`, then verify `path` against it.
pub fn verify(
    source: &dyn MetadataSource,
    path: &Path,
    options: &VerifyOptions,
) -> Result<Verification, VerifyError> {
    let remote = source.fetch()?;
    info!("ETag value: {}", remote.etag);
    verify_file(path, &remote, options)
}

/// Recompute the ETag of `path` the way the provider did and compare it to `remote`.
pub fn verify_file(
    path: &Path,
    remote: &RemoteObject,
    options: &VerifyOptions,
) -> Result<Verification, VerifyError> {
    let start = Instant::now();
    let remote_etag = ETag::parse(&remote.etag)?;
    let file_size = file_len(path)?;
    info!(
        "Input file: {} ({})",
        path.display(),
        size_to_human_readable(file_size as f64)
    );

    let pb = progress_bar(file_size, options.no_progress);
    let part_size = options.part_size.or(remote.part_size);
    let computed = if remote_etag.is_chunked() {
        let count = remote_etag.chunk_count();
        let plans = match part_size {
            Some(_) => vec![ChunkPlan::for_remote(
                file_size,
                remote.object_size,
                count,
                part_size,
            )?],
            None => ChunkPlan::remote_candidates(file_size, remote.object_size, count)?,
        };
        hash_candidates(path, &plans, &remote_etag, options, pb.as_ref())?
    } else {
        info!("Single-part ETag, hashing whole file");
        ETag::single(hash_stream(path, options.stream_block_size, pb.as_ref())?)
    };
    if let Some(pb) = pb {
        pb.finish_with_message("Integrity check finished");
    }

    let verification = Verification {
        part_size_inferred: remote_etag.is_chunked() && part_size.is_none(),
        ..Verification::compare(remote_etag, computed, start.elapsed())
    };
    if verification.is_valid {
        info!("ETag values matched");
    } else {
        warn!(
            "ETag values mismatched: remote {} calculated {}",
            verification.remote, verification.computed
        );
    }
    Ok(verification)
}

/// Hash `path` under each candidate layout until one reproduces the remote
/// digest. Without a match the first (most likely) layout's ETag is returned.
fn hash_candidates(
    path: &Path,
    plans: &[ChunkPlan],
    remote: &ETag,
    options: &VerifyOptions,
    pb: Option<&ProgressBar>,
) -> Result<ETag, VerifyError> {
    let mut first = None;
    for plan in plans {
        if let Some(pb) = pb {
            pb.reset();
        }
        let digest = hash_chunked(path, plan, options.workers, pb)?;
        let etag = ETag::multipart(digest, plan.chunk_count());
        if etag.digest() == remote.digest() {
            return Ok(etag);
        }
        if plans.len() > 1 {
            info!("Part size {} does not reproduce the ETag", plan.chunk_size());
        }
        first.get_or_insert(etag);
    }
    first.ok_or_else(|| VerifyError::InvalidConfig("no chunk layout to hash".to_string()))
}

/// The ETag `path` would get when uploaded in `part_size` parts: files that
/// fit in one part get a plain MD5.
pub fn compute_etag(
    path: &Path,
    part_size: u64,
    options: &VerifyOptions,
) -> Result<ETag, VerifyError> {
    if part_size == 0 {
        return Err(VerifyError::InvalidConfig(
            "part size must be greater than zero".to_string(),
        ));
    }
    let file_size = file_len(path)?;
    let pb = progress_bar(file_size, options.no_progress);
    let etag = if file_size <= part_size {
        ETag::single(hash_stream(path, options.stream_block_size, pb.as_ref())?)
    } else {
        let plan = ChunkPlan::for_local(file_size, part_size)?;
        let digest = hash_chunked(path, &plan, options.workers, pb.as_ref())?;
        ETag::multipart(digest, plan.chunk_count())
    };
    if let Some(pb) = pb {
        pb.finish_with_message("ETag computed");
    }
    Ok(etag)
}

fn file_len(path: &Path) -> Result<u64, VerifyError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| VerifyError::FileOpen {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_does_not_decide_validity() {
        let digest = [7u8; 16];
        let v = Verification::compare(
            ETag::multipart(digest, 3),
            ETag::multipart(digest, 4),
            Duration::ZERO,
        );
        assert!(v.is_valid);
        assert_eq!(v.outcome(), "verified");
    }

    #[test]
    fn differing_digest_is_compromised() {
        let v = Verification::compare(
            ETag::single([1u8; 16]),
            ETag::single([2u8; 16]),
            Duration::ZERO,
        );
        assert!(!v.is_valid);
        assert_eq!(v.outcome(), "compromised");
    }
}
