//! Chunk layout: how a file is cut into the byte ranges that were uploaded as parts.

use crate::error::VerifyError;
use crate::etag::DIGEST_LEN;
use log::debug;
use md5::{Digest, Md5};

pub const MIB: u64 = 1024 * 1024;
/// Part size used by the common upload tools, and our default for `compute`.
pub const DEFAULT_PART_SIZE: u64 = 5 * MIB;
/// Default part sizes of common upload tools, in MiB (8 is the AWS CLI's).
const COMMON_PART_SIZES_MIB: [u64; 9] = [5, 8, 15, 16, 32, 64, 100, 128, 512];

/// One contiguous byte range handed to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkJob {
    pub index: u32,
    pub offset: u64,
    pub length: u64,
}

/// Raw MD5 of one chunk, tagged with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkResult {
    pub index: u32,
    pub digest: [u8; DIGEST_LEN],
}

/// Validated partition of a file into `chunk_count` ranges of `chunk_size`
/// bytes, the last one possibly shorter but never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
    chunk_count: u32,
}

impl ChunkPlan {
    /// Plan matching a remote multipart ETag.
    ///
    /// `part_size` is the length of part 1 when the provider reports it;
    /// otherwise the most likely size from [`ChunkPlan::remote_candidates`]
    /// is used.
    pub fn for_remote(
        file_size: u64,
        object_size: u64,
        chunk_count: u32,
        part_size: Option<u64>,
    ) -> Result<Self, VerifyError> {
        match part_size {
            Some(0) => Err(VerifyError::InvalidConfig(
                "part size must be greater than zero".to_string(),
            )),
            Some(size) => {
                check_remote(file_size, object_size, chunk_count)?;
                Self::checked(file_size, size, chunk_count)
            }
            None => {
                let plans = Self::remote_candidates(file_size, object_size, chunk_count)?;
                Ok(plans[0])
            }
        }
    }

    /// Every plausible layout of `chunk_count` parts when the part size is
    /// unknown, most likely first: the MiB-aligned guess, the defaults of the
    /// common upload tools, then the exact ceiling division. Never empty.
    pub fn remote_candidates(
        file_size: u64,
        object_size: u64,
        chunk_count: u32,
    ) -> Result<Vec<Self>, VerifyError> {
        check_remote(file_size, object_size, chunk_count)?;
        let count = u64::from(chunk_count);
        let exact = object_size.div_ceil(count);
        let aligned = exact.div_ceil(MIB) * MIB;

        let mut plans: Vec<Self> = Vec::new();
        let sizes = std::iter::once(aligned)
            .chain(COMMON_PART_SIZES_MIB.iter().map(|mib| mib * MIB))
            .chain(std::iter::once(exact));
        for size in sizes {
            if plans.iter().any(|p| p.chunk_size == size) {
                continue;
            }
            if let Ok(plan) = Self::checked(file_size, size, chunk_count) {
                plans.push(plan);
            }
        }
        if plans.is_empty() {
            return Err(VerifyError::SizeMismatch(format!(
                "{object_size} bytes cannot be split into {chunk_count} parts of any size"
            )));
        }
        debug!(
            "Candidate part sizes for {chunk_count} parts: {:?}",
            plans.iter().map(|p| p.chunk_size).collect::<Vec<_>>()
        );
        Ok(plans)
    }

    /// Plan for uploading a local file with a fixed part size.
    pub fn for_local(file_size: u64, part_size: u64) -> Result<Self, VerifyError> {
        if part_size == 0 {
            return Err(VerifyError::InvalidConfig(
                "part size must be greater than zero".to_string(),
            ));
        }
        let chunk_count = u32::try_from(file_size.div_ceil(part_size)).map_err(|_| {
            VerifyError::InvalidConfig(format!(
                "{file_size} bytes in {part_size}-byte parts exceeds the part limit"
            ))
        })?;
        Self::checked(file_size, part_size, chunk_count)
    }

    fn checked(file_size: u64, chunk_size: u64, chunk_count: u32) -> Result<Self, VerifyError> {
        let mismatch = || {
            VerifyError::SizeMismatch(format!(
                "{file_size} bytes cannot be split into {chunk_count} chunks of {chunk_size} bytes"
            ))
        };
        if chunk_size == 0 || chunk_count == 0 {
            return Err(mismatch());
        }
        let full = u64::from(chunk_count - 1)
            .checked_mul(chunk_size)
            .ok_or_else(&mismatch)?;
        if full >= file_size || file_size - full > chunk_size {
            return Err(mismatch());
        }
        Ok(Self {
            file_size,
            chunk_size,
            chunk_count,
        })
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// `index` must be below `chunk_count`.
    fn job(&self, index: u32) -> ChunkJob {
        let offset = u64::from(index) * self.chunk_size;
        ChunkJob {
            index,
            offset,
            length: self.chunk_size.min(self.file_size - offset),
        }
    }

    /// Every job, in ascending index order.
    pub fn jobs(&self) -> impl Iterator<Item = ChunkJob> + '_ {
        (0..self.chunk_count).map(move |i| self.job(i))
    }
}

fn check_remote(file_size: u64, object_size: u64, chunk_count: u32) -> Result<(), VerifyError> {
    if chunk_count == 0 {
        return Err(VerifyError::InvalidConfig(
            "a chunk plan needs at least one chunk".to_string(),
        ));
    }
    if file_size != object_size {
        return Err(VerifyError::SizeMismatch(format!(
            "local file is {file_size} bytes but the remote object is {object_size} bytes"
        )));
    }
    Ok(())
}

pub(crate) fn finalize(hasher: Md5) -> [u8; DIGEST_LEN] {
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_five_mib_parts() {
        let plan = ChunkPlan::for_remote(15 * MIB, 15 * MIB, 3, None).unwrap();
        assert_eq!(plan.chunk_size(), 5 * MIB);
        assert_eq!(plan.jobs().map(|j| j.length).sum::<u64>(), 15 * MIB);
    }

    #[test]
    fn infers_unaligned_size_when_mib_alignment_changes_count() {
        // 10 bytes in 4 parts: 1 MiB parts would give a single part
        let plan = ChunkPlan::for_remote(10, 10, 4, None).unwrap();
        assert_eq!(plan.chunk_size(), 3);
        assert_eq!(plan.job(3).length, 1);
    }

    #[test]
    fn explicit_part_size_leaves_short_tail() {
        let size = 11 * MIB + 123;
        let plan = ChunkPlan::for_remote(size, size, 3, Some(5 * MIB)).unwrap();
        let jobs: Vec<_> = plan.jobs().collect();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[2].offset, 10 * MIB);
        assert_eq!(jobs[2].length, MIB + 123);
    }

    #[test]
    fn rejects_empty_last_chunk() {
        let err = ChunkPlan::for_remote(10 * MIB, 10 * MIB, 3, Some(5 * MIB)).unwrap_err();
        assert!(matches!(err, VerifyError::SizeMismatch(_)));
    }

    #[test]
    fn rejects_oversized_last_chunk() {
        let err = ChunkPlan::for_remote(20 * MIB, 20 * MIB, 3, Some(5 * MIB)).unwrap_err();
        assert!(matches!(err, VerifyError::SizeMismatch(_)));
    }

    #[test]
    fn rejects_declared_size_disagreeing_with_file() {
        let err = ChunkPlan::for_remote(15 * MIB - 1, 15 * MIB, 3, None).unwrap_err();
        assert!(matches!(err, VerifyError::SizeMismatch(_)));
    }

    #[test]
    fn candidates_include_aws_cli_default() {
        // 17 MiB in 3 parts: the aligned guess is 6 MiB, the AWS CLI uses 8 MiB
        let sizes: Vec<u64> = ChunkPlan::remote_candidates(17 * MIB, 17 * MIB, 3)
            .unwrap()
            .iter()
            .map(|p| p.chunk_size())
            .collect();
        assert_eq!(sizes[0], 6 * MIB);
        assert!(sizes.contains(&(8 * MIB)));
        assert!(!sizes.contains(&(5 * MIB)));
        assert!(!sizes.contains(&(16 * MIB)));
    }

    #[test]
    fn out_of_range_jobs_are_never_produced() {
        let plan = ChunkPlan::for_local(10, 4).unwrap();
        let jobs: Vec<_> = plan.jobs().collect();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs.iter().map(|j| j.length).sum::<u64>(), 10);
    }

    #[test]
    fn local_plan_counts_partial_tail() {
        let plan = ChunkPlan::for_local(5 * MIB + 1, 5 * MIB).unwrap();
        assert_eq!(plan.chunk_count(), 2);
        assert_eq!(plan.job(1).length, 1);
    }
}
