/// Project overview:
/// - Verifies a downloaded S3 object by recomputing its ETag locally
/// - Multipart ETags: MD5 of the concatenated raw part MD5s, suffixed with the part count
/// - Parts are hashed in parallel; each worker owns its own file handle and takes one job at a time
/// - An aggregator folds part digests back in index order, so the result never depends on timing
/// - Single-part ETags are a plain MD5 computed in one sequential pass
///
/// Key behaviors:
/// - Any I/O or size inconsistency aborts the whole run; there is no partial success
/// - A differing digest is a completed verification with `is_valid == false`, not an error
///
/// Flags:
/// - no_progress: disables progress bar
/// - part_size: overrides the part size reported by (or inferred from) the remote metadata
pub mod chunk;
pub mod dispatch;
pub mod error;
pub mod etag;
pub mod source;
pub mod stream;
pub mod utils;
pub mod verify;

mod aggregate;
mod worker;

pub use chunk::{ChunkJob, ChunkPlan, ChunkResult, DEFAULT_PART_SIZE, MIB};
pub use dispatch::hash_chunked;
pub use error::VerifyError;
pub use etag::ETag;
pub use source::{MetadataSource, RemoteObject, StaticSource};
pub use stream::{hash_stream, DEFAULT_STREAM_BLOCK_SIZE};
pub use verify::{compute_etag, verify, verify_file, Verification};

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Number of chunk workers, each with its own file handle.
    pub workers: usize,
    /// Read size for single-part hashing. Has no effect on the digest.
    pub stream_block_size: usize,
    /// Overrides the part size reported by the metadata source.
    pub part_size: Option<u64>,
    /// Hide the progress bar.
    pub no_progress: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            stream_block_size: DEFAULT_STREAM_BLOCK_SIZE,
            part_size: None,
            no_progress: false,
        }
    }
}
